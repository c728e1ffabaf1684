//! Efficiency resolution seen from outside the crate, alone and inside a
//! converter

mod common;

use common::*;
use pdn_core::*;

fn curve(points: &[(f64, f64)]) -> EfficiencyModel {
    EfficiencyModel::Curve1D {
        points: points.iter().map(|&(i, eta)| CurvePoint::new(i, eta)).collect(),
        per_phase: false,
    }
}

fn table() -> EfficiencyModel {
    EfficiencyModel::Curve2D {
        table: Some(EfficiencyTable {
            output_voltages: vec![1.0, 3.3, 5.0],
            output_currents: vec![0.1, 1.0, 5.0],
            values: vec![
                vec![Some(0.70), Some(0.80), Some(0.75)],
                vec![Some(0.80), Some(0.90), Some(0.85)],
                vec![Some(0.85), None, Some(0.92)],
            ],
        }),
        per_phase: false,
    }
}

#[test]
fn resolved_efficiency_stays_in_unit_interval() {
    let models = [
        EfficiencyModel::fixed(0.93),
        EfficiencyModel::fixed(1.4),
        EfficiencyModel::fixed(-0.2),
        curve(&[(0.0, 0.6), (2.0, 1.2), (4.0, -0.1)]),
        table(),
        EfficiencyModel::Curve2D {
            table: None,
            per_phase: true,
        },
    ];

    for model in &models {
        for i_out in [0.0, 0.05, 0.5, 1.0, 2.5, 5.0, 40.0] {
            for v_out in [0.5, 1.0, 1.8, 3.3, 5.0, 12.0] {
                let op = OperatingPoint::new(i_out * v_out, i_out, v_out);
                let eta = resolve_efficiency(model, &op);
                assert!((0.0..=1.0).contains(&eta), "{model:?} at {op:?} gave {eta}");
            }
        }
    }
}

#[test]
fn curve_passes_through_points_and_segments() {
    let points = [(0.1, 0.72), (0.5, 0.86), (2.0, 0.93), (6.0, 0.88)];
    let model = curve(&points);

    for &(i, eta) in &points {
        let op = OperatingPoint::new(0.0, i, 3.3);
        assert!((resolve_efficiency(&model, &op) - eta).abs() < TOL);
    }

    // A quarter of the way along (0.5, 0.86) -> (2.0, 0.93)
    let op = OperatingPoint::new(0.0, 0.875, 3.3);
    assert!((resolve_efficiency(&model, &op) - (0.86 + 0.25 * 0.07)).abs() < TOL);
}

#[test]
fn table_clamps_outside_voltage_range() {
    let model = table();
    let at = |v: f64| resolve_efficiency(&model, &OperatingPoint::new(0.0, 1.0, v));

    assert!((at(0.2) - at(1.0)).abs() < TOL);
    assert!((at(1.0) - 0.80).abs() < TOL);
    // The 5 V row has no value at 1 A, so the top of the range is 3.3 V
    assert!((at(24.0) - 0.90).abs() < TOL);
}

#[test]
fn malformed_models_resolve_to_default() {
    let op = OperatingPoint::new(5.0, 1.0, 5.0);
    assert_eq!(resolve_efficiency(&curve(&[]), &op), DEFAULT_EFFICIENCY);
    assert_eq!(
        resolve_efficiency(
            &EfficiencyModel::Curve2D {
                table: Some(EfficiencyTable::default()),
                per_phase: false,
            },
            &op
        ),
        DEFAULT_EFFICIENCY
    );
}

#[test]
fn multiphase_converter_reads_curve_per_phase() {
    let model = EfficiencyModel::Curve1D {
        points: vec![CurvePoint::new(0.0, 0.80), CurvePoint::new(10.0, 0.90)],
        per_phase: true,
    };
    let mut project = Project::new();
    project
        .add_node(source("vin", 12.0))
        .add_node(Node::new(
            "vcore",
            NodeKind::Converter(Converter {
                vin_min: Volts(10.0),
                vin_max: Volts(14.0),
                vout: Volts(1.0),
                iout_max: Amperes(0.0),
                efficiency: model,
                phase_count: 4,
            }),
        ))
        .add_node(load("cpu", 1.0, 20.0, 20.0));
    project
        .add_edge(Edge::new("e1", "vin", "vcore"))
        .add_edge(Edge::new("e2", "vcore", "cpu"));

    let result = compute(&project);
    let vcore = result.node("vcore").unwrap();

    // 20 A over 4 phases puts each phase at 5 A
    assert!(approx(vcore.eta.unwrap(), 0.85));
    assert!(approx(vcore.p_in, 20.0 / 0.85));
}
