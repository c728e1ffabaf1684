//! Builders shared by the integration tests

#![allow(dead_code)]

use pdn_core::*;

pub const TOL: f64 = 1e-9;

pub fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-6
}

pub fn source(id: &str, vout: f64) -> Node {
    Node::new(id, NodeKind::Source(Source { vout: Volts(vout) }))
}

pub fn converter(id: &str, vin_min: f64, vin_max: f64, vout: f64, eta: f64) -> Node {
    converter_with(id, vin_min, vin_max, vout, EfficiencyModel::fixed(eta), 0.0)
}

pub fn converter_with(
    id: &str,
    vin_min: f64,
    vin_max: f64,
    vout: f64,
    efficiency: EfficiencyModel,
    iout_max: f64,
) -> Node {
    Node::new(
        id,
        NodeKind::Converter(Converter {
            vin_min: Volts(vin_min),
            vin_max: Volts(vin_max),
            vout: Volts(vout),
            iout_max: Amperes(iout_max),
            efficiency,
            phase_count: 1,
        }),
    )
}

pub fn load(id: &str, vreq: f64, i_typ: f64, i_max: f64) -> Node {
    load_from(id, Load::new(Volts(vreq), Amperes(i_typ), Amperes(i_max)))
}

pub fn load_from(id: &str, load: Load) -> Node {
    Node::new(id, NodeKind::Load(load))
}

pub fn bus(id: &str, v_bus: f64, r_milliohm: f64) -> Node {
    Node::new(
        id,
        NodeKind::Bus(Bus {
            v_bus: Volts(v_bus),
            r_milliohm: Milliohms(r_milliohm),
        }),
    )
}

pub fn port(id: &str, vout: f64) -> Node {
    Node::new(
        id,
        NodeKind::SubsystemInput(SubsystemInput { vout: Volts(vout) }),
    )
}

pub fn subsystem(id: &str, project: Project, copies: u32) -> Node {
    Node::new(
        id,
        NodeKind::Subsystem(Subsystem {
            project,
            num_paralleled_systems: copies,
            input_handle_order: Vec::new(),
        }),
    )
}

/// Source(12 V) -> Converter(9..vin_max V -> 5 V, eta 0.9) -> Load(5 V, 2 A)
pub fn buck_chain(vin_max: f64) -> Project {
    let mut project = Project::new();
    project
        .add_node(source("vin", 12.0))
        .add_node(converter("buck", 9.0, vin_max, 5.0, 0.9))
        .add_node(load("mcu", 5.0, 2.0, 2.0));
    project
        .add_edge(Edge::new("e1", "vin", "buck"))
        .add_edge(Edge::new("e2", "buck", "mcu"));
    project
}

/// Nested project with one port feeding a single load of `watts` at 5 V
pub fn five_volt_block(watts: f64) -> Project {
    let mut inner = Project::new();
    inner
        .add_node(port("p", 5.0))
        .add_node(load("ld", 5.0, watts / 5.0, watts / 5.0));
    inner.add_edge(Edge::new("ie1", "p", "ld"));
    inner
}
