//! Tests for axes bound to several sites of one template
//!
//! These tests verify:
//! - A value tuple rewrites all of its sites together
//! - Rewriting one site leaves the literal text of the others untouched
//! - Axes over different templates each get their own private copy

use std::fs;
use std::sync::Mutex;

use tempfile::TempDir;

use crate::axis::Axis;
use crate::dispatcher::{Dispatcher, RunOptions};
use crate::files::private_path;
use crate::value::{Combination, Value};

fn pairs(values: &[(i64, i64)]) -> Vec<Vec<Value>> {
    values
        .iter()
        .map(|&(a, b)| vec![Value::Int(a), Value::Int(b)])
        .collect()
}

#[test]
fn test_pair_rewrites_both_sites() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("model.in");
    fs::write(&template, "a=0;\nb=0;\n").unwrap();

    let mut axis = Axis::with_sites(&template, &[r"a=(\d+);", r"b=(\d+);"]).unwrap();
    axis.set_tuples(pairs(&[(1, 11), (2, 12), (3, 13), (4, 14)]))
        .unwrap();
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(axis);

    let texts = Mutex::new(Vec::new());
    let report = dispatcher
        .run(
            &|slot: usize, unit: &Combination| {
                let text = fs::read_to_string(private_path(&template, slot)).unwrap();
                texts.lock().unwrap().push((unit.to_string(), text));
                0
            },
            &RunOptions {
                workers: 2,
                skip_prompt: true,
                ..Default::default()
            },
        )
        .unwrap();

    assert!(report.is_success());
    let texts = texts.into_inner().unwrap();
    assert_eq!(texts.len(), 4);
    let (_, text) = texts.iter().find(|(unit, _)| unit == "3,13").unwrap();
    assert_eq!(text, "a=3;\nb=13;\n");
    for (unit, text) in &texts {
        let (a, b) = unit.split_once(',').unwrap();
        assert_eq!(text, &format!("a={a};\nb={b};\n"));
    }
}

#[test]
fn test_site_values_zip_per_site_sequences() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("grid.cfg");
    fs::write(&template, "nx=1 ny=1\n").unwrap();

    let mut axis = Axis::with_sites(&template, &[r"nx=(\d+)", r"ny=(\d+)"]).unwrap();
    axis.set_site_values(vec![
        vec![10.into(), 20.into()],
        vec![30.into(), 60.into()],
    ])
    .unwrap();

    assert_eq!(axis.len(), 2);
    assert_eq!(axis.values()[1], vec![Value::Int(20), Value::Int(60)]);
}

#[test]
fn test_axes_over_separate_templates() {
    let dir = TempDir::new().unwrap();
    let physics = dir.path().join("physics.cfg");
    let mesh = dir.path().join("mesh.cfg");
    fs::write(&physics, "viscosity = 1.0\n").unwrap();
    fs::write(&mesh, "cells: 8\n").unwrap();

    let mut viscosity = Axis::new(&physics, r"viscosity = (\S+)").unwrap();
    viscosity.set_values([0.5, 2.5]).unwrap();
    let mut cells = Axis::new(&mesh, r"cells: (\d+)").unwrap();
    cells.set_values([16, 32, 64]).unwrap();

    let mut dispatcher = Dispatcher::new();
    dispatcher.register(viscosity).register(cells);

    let seen = Mutex::new(Vec::new());
    dispatcher
        .run(
            &|slot: usize, _: &Combination| {
                let p = fs::read_to_string(private_path(&physics, slot)).unwrap();
                let m = fs::read_to_string(private_path(&mesh, slot)).unwrap();
                seen.lock().unwrap().push(format!("{}|{}", p.trim(), m.trim()));
                0
            },
            &RunOptions {
                workers: 3,
                skip_prompt: true,
                ..Default::default()
            },
        )
        .unwrap();

    let mut seen = seen.into_inner().unwrap();
    seen.sort();
    assert_eq!(seen.len(), 6);
    assert!(seen.contains(&"viscosity = 2.5|cells: 32".to_string()));
    assert_eq!(fs::read_to_string(&mesh).unwrap(), "cells: 8\n");
}

#[test]
fn test_replacement_value_with_dollar_is_literal() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("env.sh");
    fs::write(&template, "NAME=old\n").unwrap();

    let mut axis = Axis::new(&template, r"NAME=(\w+)").unwrap();
    axis.set_values(["$HOME"]).unwrap();
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(axis);

    let text = Mutex::new(String::new());
    dispatcher
        .run(
            &|slot: usize, _: &Combination| {
                *text.lock().unwrap() = fs::read_to_string(private_path(&template, slot)).unwrap();
                0
            },
            &RunOptions {
                skip_prompt: true,
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(text.into_inner().unwrap(), "NAME=$HOME\n");
}
