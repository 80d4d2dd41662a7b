//! YAML sweep plans
//!
//! ```yaml
//! command: ./model --config {config} --tag run{slot}
//! axes:
//!   - template: model.cfg
//!     sites: ['rate=(\S+);']
//!     values: [0.1, 0.2, 0.4]
//!   - template: model.cfg
//!     sites: ['nx=(\d+);', 'ny=(\d+);']
//!     site_values: [[10, 20], [30, 60]]
//!   - template: mesh.cfg
//!     sites: ['(?m)^cells: (\d+)$']
//!     range: { start: 8, stop: 128, increment: 2, rule: multiply }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{WrapErr, bail, eyre};
use juggler_core::{Axis, Dispatcher, SiteFlags, Tuple, Value};
use serde::Deserialize;

/// How a range advances from one value to the next
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeRule {
    #[default]
    Add,
    Multiply,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangePlan {
    pub start: Value,
    pub stop: Value,
    pub increment: Value,
    #[serde(default)]
    pub rule: RangeRule,
}

/// One axis of the plan. Exactly one of `values`, `tuples`, `site_values`
/// or `range` must be given.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisPlan {
    pub template: PathBuf,
    pub sites: Vec<String>,
    #[serde(default)]
    pub flags: SiteFlags,
    pub values: Option<Vec<Value>>,
    pub tuples: Option<Vec<Tuple>>,
    pub site_values: Option<Vec<Vec<Value>>>,
    pub range: Option<RangePlan>,
}

/// The command run for every unit, either one line split on whitespace or
/// an explicit argument list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    Line(String),
    Argv(Vec<String>),
}

impl CommandLine {
    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<String> {
        match self {
            CommandLine::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            CommandLine::Argv(argv) => argv.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepPlan {
    pub command: CommandLine,
    pub axes: Vec<AxisPlan>,
}

impl SweepPlan {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(yaml)
    }

    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let yaml = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read plan {}", path.display()))?;
        let plan = Self::from_yaml(&yaml)
            .wrap_err_with(|| format!("failed to parse plan {}", path.display()))?;
        if plan.command.argv().is_empty() {
            bail!("plan {} has an empty command", path.display());
        }
        Ok(plan)
    }

    /// Register every axis with a new dispatcher, resolving relative
    /// template paths against `base_dir`.
    pub fn dispatcher(&self, base_dir: &Path) -> color_eyre::Result<Dispatcher> {
        let mut dispatcher = Dispatcher::new();
        for (index, axis_plan) in self.axes.iter().enumerate() {
            let axis = axis_plan
                .build(base_dir)
                .wrap_err_with(|| format!("axis {index} ({})", axis_plan.template.display()))?;
            dispatcher.register(axis);
        }
        Ok(dispatcher)
    }
}

impl AxisPlan {
    fn build(&self, base_dir: &Path) -> color_eyre::Result<Axis> {
        let template = base_dir.join(&self.template);
        let sites: Vec<&str> = self.sites.iter().map(String::as_str).collect();
        let mut axis = Axis::with_flags(template, &sites, self.flags)?;

        match (&self.values, &self.tuples, &self.site_values, &self.range) {
            (Some(values), None, None, None) => axis.set_values(values.iter().cloned())?,
            (None, Some(tuples), None, None) => axis.set_tuples(tuples.clone())?,
            (None, None, Some(sequences), None) => axis.set_site_values(sequences.clone())?,
            (None, None, None, Some(range)) => apply_range(&mut axis, range)?,
            _ => bail!("expected exactly one of values, tuples, site_values or range"),
        }
        Ok(axis)
    }
}

fn apply_range(axis: &mut Axis, range: &RangePlan) -> color_eyre::Result<()> {
    if let (Value::Int(start), Value::Int(stop), Value::Int(increment)) =
        (&range.start, &range.stop, &range.increment)
    {
        let rule: fn(i64, i64) -> Option<i64> = match range.rule {
            RangeRule::Add => i64::checked_add,
            RangeRule::Multiply => i64::checked_mul,
        };
        axis.set_range_checked(*start, *stop, *increment, rule)?;
        return Ok(());
    }

    let number = |value: &Value| {
        value
            .as_f64()
            .ok_or_else(|| eyre!("range bound `{value}` is not a number"))
    };
    let (start, stop, increment) = (
        number(&range.start)?,
        number(&range.stop)?,
        number(&range.increment)?,
    );
    match range.rule {
        RangeRule::Add => axis.set_range(start, stop, increment)?,
        RangeRule::Multiply => axis.set_range_with(start, stop, increment, |v, k| v * k)?,
    }
    Ok(())
}
