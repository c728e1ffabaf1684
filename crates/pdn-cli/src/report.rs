//! Table rendering of engine results.

use std::io::{self, Write};

use pdn_core::{
    Amperes, ComputeResult, CurrentUnit, DeepAggregates, Diagnostics, DisplayUnits, PowerUnit,
    Project, Watts,
};
use tabwriter::TabWriter;

/// Number formatting for table output
#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub decimals: usize,
    pub units: DisplayUnits,
}

impl Style {
    pub fn new(decimals: usize, units: DisplayUnits) -> Self {
        Self { decimals, units }
    }

    fn power(&self, watts: f64) -> String {
        format!(
            "{:.*}",
            self.decimals,
            Watts(watts).in_unit(self.units.power)
        )
    }

    fn current(&self, amps: f64) -> String {
        format!(
            "{:.*}",
            self.decimals,
            Amperes(amps).in_unit(self.units.current)
        )
    }

    fn number(&self, value: f64) -> String {
        format!("{:.*}", self.decimals, value)
    }

    fn optional(&self, value: Option<f64>) -> String {
        value.map_or_else(|| "-".to_string(), |v| self.number(v))
    }

    fn power_unit(&self) -> &'static str {
        self.units.power.symbol()
    }

    fn current_unit(&self) -> &'static str {
        self.units.current.symbol()
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::new(
            4,
            DisplayUnits {
                power: PowerUnit::Watt,
                current: CurrentUnit::Ampere,
            },
        )
    }
}

/// Node table, edge table, totals and the warning list
pub fn write_compute<W: Write>(
    writer: W,
    project: &Project,
    result: &ComputeResult,
    style: &Style,
) -> io::Result<()> {
    let mut tw = TabWriter::new(writer);
    let (pu, cu) = (style.power_unit(), style.current_unit());

    writeln!(tw, "Scenario: {}", project.current_scenario)?;
    writeln!(tw)?;
    writeln!(
        tw,
        "NODE\tTYPE\tV_IN (V)\tP_IN ({pu})\tP_OUT ({pu})\tI_IN ({cu})\tI_OUT ({cu})\tLOSS ({pu})\tETA\tWARNINGS"
    )?;
    for node in &project.nodes {
        let Some(r) = result.node(node.id.as_str()) else {
            continue;
        };
        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            node.id,
            node.kind.type_name(),
            style.optional(r.v_upstream),
            style.power(r.p_in),
            style.power(r.p_out),
            style.current(r.i_in),
            style.current(r.i_out),
            r.loss.map_or_else(|| "-".to_string(), |l| style.power(l)),
            style.optional(r.eta),
            r.warnings.len()
        )?;
        if let Some(branches) = &r.branch_results {
            for (id, branch) in branches {
                writeln!(
                    tw,
                    "  {}.{}\tbranch\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    node.id,
                    id,
                    style.number(branch.v_out),
                    style.power(branch.p_in),
                    style.power(branch.p_out),
                    style.current(branch.i_in),
                    style.current(branch.i_out),
                    style.power(branch.loss),
                    style.number(branch.eta),
                    branch.warnings.len()
                )?;
            }
        }
    }

    writeln!(tw)?;
    writeln!(
        tw,
        "EDGE\tFROM\tTO\tV (V)\tI ({cu})\tP ({pu})\tLOSS ({pu})\tWARNINGS"
    )?;
    for edge in &project.edges {
        let Some(r) = result.edge(edge.id.as_str()) else {
            continue;
        };
        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            edge.id,
            edge.from,
            edge.to,
            style.optional(r.voltage),
            style.current(r.current),
            style.power(r.power),
            style.power(r.loss),
            r.warnings.len()
        )?;
    }

    let totals = &result.totals;
    writeln!(tw)?;
    writeln!(tw, "Source power\t{} {pu}", style.power(totals.source_power))?;
    writeln!(tw, "Load power\t{} {pu}", style.power(totals.load_power))?;
    writeln!(tw, "Converter loss\t{} {pu}", style.power(totals.converter_loss))?;
    writeln!(tw, "Edge loss\t{} {pu}", style.power(totals.edge_loss))?;
    writeln!(tw, "Efficiency\t{}", style.optional(totals.efficiency))?;
    writeln!(tw)?;
    write_diagnostics(&mut tw, &result.global_warnings)?;
    tw.flush()
}

/// Deep aggregate figures
pub fn write_aggregates<W: Write>(
    writer: W,
    aggregates: &DeepAggregates,
    style: &Style,
) -> io::Result<()> {
    let mut tw = TabWriter::new(writer);
    let pu = style.power_unit();
    writeln!(
        tw,
        "Critical load power\t{} {pu}",
        style.power(aggregates.critical_load_power)
    )?;
    writeln!(
        tw,
        "Non-critical load power\t{} {pu}",
        style.power(aggregates.non_critical_load_power)
    )?;
    writeln!(
        tw,
        "Total load power\t{} {pu}",
        style.power(aggregates.total_load_power)
    )?;
    writeln!(tw, "Converter loss\t{} {pu}", style.power(aggregates.converter_loss))?;
    writeln!(tw, "Edge loss\t{} {pu}", style.power(aggregates.edge_loss))?;
    tw.flush()
}

fn write_diagnostics<W: Write>(writer: &mut W, diagnostics: &Diagnostics) -> io::Result<()> {
    write!(writer, "{diagnostics}")
}
