// SPDX-License-Identifier: Apache-2.0

use chainstitch::{
    DiscoveredPort, Direction, EntityDescription, ModuleLibrary, ProcessingChain,
};

fn stream_entity(name: &str) -> EntityDescription {
    EntityDescription::new(name)
        .port(DiscoveredPort::bit("clk", Direction::In))
        .port(DiscoveredPort::bit("reset", Direction::In))
        .port(DiscoveredPort::bit("ready", Direction::Out))
        .port(DiscoveredPort::bit("in_strobe", Direction::In))
        .port(DiscoveredPort::vector("in_data", Direction::In, "7 downto 0"))
        .port(DiscoveredPort::bit("out_strobe", Direction::Out))
        .port(DiscoveredPort::vector("out_data", Direction::Out, "7 downto 0"))
}

fn main() {
    env_logger::init();

    // Register manager instantiated once per register interface
    let manager_width = "0 to REG_COUNT-1";
    let manager = EntityDescription::new("as_regmgr")
        .generic("REG_COUNT", None)
        .generic("MODULE_BASEADDR", None)
        .port(DiscoveredPort::new("slv_ctrl_reg", Direction::Out, "slv_reg_data", manager_width))
        .port(DiscoveredPort::new("slv_status_reg", Direction::In, "slv_reg_data", manager_width))
        .port(DiscoveredPort::vector("slv_reg_modify", Direction::In, manager_width))
        .port(DiscoveredPort::new("slv_reg_config", Direction::In, "slv_reg_config_table", manager_width));

    // A stream filter with two registers: a threshold written by software
    // and a pixel count read back by it
    let threshold = stream_entity("as_threshold")
        .constant("slave_register_configuration", r#"("10","01")"#)
        .port(DiscoveredPort::new("slv_ctrl_reg", Direction::In, "slv_reg_data", "0 to 1"))
        .port(DiscoveredPort::new("slv_status_reg", Direction::Out, "slv_reg_data", "0 to 1"))
        .port(DiscoveredPort::vector("slv_reg_modify", Direction::Out, "0 to 1"))
        .port(DiscoveredPort::new("slv_reg_config", Direction::Out, "slv_reg_config_table", "0 to 1"));

    let mut library = ModuleLibrary::new();
    for entity in [manager, threshold, stream_entity("as_invert"), stream_entity("as_sink")] {
        library.add_entity(entity).unwrap();
    }

    let chain = ProcessingChain::new(library);
    let invert = chain.add_module("as_invert", "invert").unwrap();
    let threshold = chain.add_module("as_threshold", "threshold").unwrap();
    let sink = chain.add_module("as_sink", "sink").unwrap();

    // The first stage takes its pixels from the top level
    invert.get_interface("in").unwrap().make_external();
    chain.connect(&invert, &threshold);
    chain.connect(&threshold, &sink);
    sink.get_interface("out").unwrap().make_external();

    match chain.auto_connect() {
        Ok(diagnostics) => {
            println!("Address map:");
            for entry in chain.address_map() {
                println!("  {entry}");
            }
            print!("{}", diagnostics.report());
        }
        Err(err) => {
            eprint!("{}", err.report());
            std::process::exit(1);
        }
    }
}
