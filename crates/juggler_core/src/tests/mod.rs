//! Integration tests for the sweep engine
//!
//! Tests are organized by topic:
//! - `sweep` - Shared-memory runs over a three-axis template
//! - `multi_site` - Axes rewriting several sites of one file together
//! - `failures` - Stop flag, failure reports and configuration errors
//! - `concurrency` - Claim stress under many threads
//! - `distributed` - Coordinator/worker protocol over the in-process world

mod distributed;
mod multi_site;

use std::fs;
use std::path::{Path, PathBuf};

use crate::axis::Axis;
use crate::dispatcher::Dispatcher;
use crate::value::Combination;

pub(crate) const TEMPLATE_TEXT: &str = "a=[0,1,2]\n";

/// Write the `a=[0,1,2]` template into `dir` and register three single-site
/// axes over it: `[0,1,2,3]`, `[-2,-0.5,1]` and `[0,30,60,90]` (48 units).
pub(crate) fn three_axis_sweep(dir: &Path) -> (PathBuf, Dispatcher) {
    let template = dir.join("params.txt");
    fs::write(&template, TEMPLATE_TEXT).unwrap();

    let mut first = Axis::new(&template, r"a=\[(.*?),.*?,.*?\]").unwrap();
    first.set_range(0, 3, 1).unwrap();

    let mut second = Axis::new(&template, r"a=\[.*?,(.*?),.*?\]").unwrap();
    second.set_values([-2.0, -0.5, 1.0]).unwrap();

    let mut third = Axis::new(&template, r"a=\[.*?,.*?,(.*?)\]").unwrap();
    third.set_range(0, 90, 30).unwrap();

    let mut dispatcher = Dispatcher::new();
    dispatcher.register(first).register(second).register(third);
    (template, dispatcher)
}

/// Text a slot's private copy must hold while `unit` runs
pub(crate) fn expected_text(unit: &Combination) -> String {
    let values: Vec<String> = unit.tuples().map(|t| t[0].to_string()).collect();
    format!("a=[{}]\n", values.join(","))
}
