//! Parameter axes: substitution sites in one template bound to a sequence
//! of value tuples.
//!
//! # Example
//!
//! ```ignore
//! use juggler_core::Axis;
//!
//! let mut rate = Axis::new("model.cfg", r"rate=(\S+);")?;
//! rate.set_range(0.5, 2.0, 0.5)?;
//!
//! let mut shape = Axis::with_sites("model.cfg", &[r"nx=(\d+);", r"ny=(\d+);"])?;
//! shape.set_site_values(vec![vec![10.into(), 20.into()], vec![30.into(), 60.into()]])?;
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result, SweepError};
use crate::files::private_path;
use crate::site::{Site, SiteFlags};
use crate::value::{Tuple, Value};

/// One dimension of the sweep
#[derive(Debug, Clone)]
pub struct Axis {
    template: PathBuf,
    sites: Vec<Site>,
    values: Vec<Tuple>,
}

impl Axis {
    /// Single-site axis
    pub fn new(template: impl Into<PathBuf>, pattern: &str) -> Result<Self> {
        Self::with_flags(template, &[pattern], SiteFlags::default())
    }

    /// Axis rewriting several sites of the same template together
    pub fn with_sites(template: impl Into<PathBuf>, patterns: &[&str]) -> Result<Self> {
        Self::with_flags(template, patterns, SiteFlags::default())
    }

    /// Bind `patterns` to `template`.
    ///
    /// Every pattern must compile, hold exactly one capture group and match
    /// the template as it is on disk now, and its complementary pattern must
    /// find the region to rewrite.
    pub fn with_flags(
        template: impl Into<PathBuf>,
        patterns: &[&str],
        flags: SiteFlags,
    ) -> Result<Self> {
        let template = template.into();
        if patterns.is_empty() {
            return Err(ConfigError::NoSites { template }.into());
        }

        let text = fs::read_to_string(&template).map_err(|e| SweepError::io(&template, e))?;

        let mut sites = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let site = Site::new(pattern, flags)?;
            if !site.is_match(&text) {
                return Err(ConfigError::SiteNotFound {
                    pattern: (*pattern).to_string(),
                    template,
                }
                .into());
            }
            if !site.can_rewrite(&text) {
                return Err(ConfigError::NothingToRewrite {
                    pattern: (*pattern).to_string(),
                    path: template,
                }
                .into());
            }
            sites.push(site);
        }

        Ok(Self {
            template,
            sites,
            values: Vec::new(),
        })
    }

    #[must_use]
    pub fn template(&self) -> &Path {
        &self.template
    }

    #[must_use]
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    #[must_use]
    pub fn values(&self) -> &[Tuple] {
        &self.values
    }

    /// Number of elements along this axis
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Scalar values for a single-site axis, each wrapped into a 1-tuple.
    pub fn set_values<I, V>(&mut self, values: I) -> std::result::Result<(), ConfigError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.set_tuples(values.into_iter().map(|v| vec![v.into()]).collect())
    }

    /// Explicit value tuples, one value per site.
    pub fn set_tuples(&mut self, tuples: Vec<Tuple>) -> std::result::Result<(), ConfigError> {
        if let Some(bad) = tuples.iter().find(|t| t.len() != self.sites.len()) {
            return Err(ConfigError::TupleArity {
                template: self.template.clone(),
                expected: self.sites.len(),
                found: bad.len(),
            });
        }
        self.values = tuples;
        Ok(())
    }

    /// One value sequence per site, zipped positionally into tuples.
    pub fn set_site_values(
        &mut self,
        sequences: Vec<Vec<Value>>,
    ) -> std::result::Result<(), ConfigError> {
        if sequences.len() != self.sites.len() {
            return Err(ConfigError::SequenceCount {
                template: self.template.clone(),
                sites: self.sites.len(),
                sequences: sequences.len(),
            });
        }

        let expected = sequences.first().map_or(0, Vec::len);
        if let Some((site, seq)) = sequences
            .iter()
            .enumerate()
            .find(|(_, seq)| seq.len() != expected)
        {
            return Err(ConfigError::SequenceLength {
                template: self.template.clone(),
                site,
                expected,
                found: seq.len(),
            });
        }

        let mut tuples: Vec<Tuple> = (0..expected)
            .map(|_| Vec::with_capacity(sequences.len()))
            .collect();
        for seq in sequences {
            for (tuple, value) in tuples.iter_mut().zip(seq) {
                tuple.push(value);
            }
        }
        self.set_tuples(tuples)
    }

    /// Additive progression from `start` while the value stays `<= stop`.
    pub fn set_range<T>(
        &mut self,
        start: T,
        stop: T,
        increment: T,
    ) -> std::result::Result<(), ConfigError>
    where
        T: Copy + PartialOrd + Into<Value> + std::ops::Add<Output = T>,
    {
        self.set_range_with(start, stop, increment, |value, inc| value + inc)
    }

    /// Progression from `start` where each next value is
    /// `rule(value, increment)`, kept while the value stays `<= stop`.
    ///
    /// The rule must strictly increase the value, otherwise the progression
    /// would never reach `stop`.
    pub fn set_range_with<T, F>(
        &mut self,
        start: T,
        stop: T,
        increment: T,
        rule: F,
    ) -> std::result::Result<(), ConfigError>
    where
        T: Copy + PartialOrd + Into<Value>,
        F: Fn(T, T) -> T,
    {
        self.set_range_checked(start, stop, increment, |value, inc| Some(rule(value, inc)))
    }

    /// Like [`set_range_with`](Self::set_range_with), for rules that can run
    /// out of range: a rule returning `None` ends the progression.
    pub fn set_range_checked<T, F>(
        &mut self,
        start: T,
        stop: T,
        increment: T,
        rule: F,
    ) -> std::result::Result<(), ConfigError>
    where
        T: Copy + PartialOrd + Into<Value>,
        F: Fn(T, T) -> Option<T>,
    {
        let mut values: Vec<Value> = Vec::new();
        let mut value = start;
        while value <= stop {
            values.push(value.into());
            let Some(next) = rule(value, increment) else {
                break;
            };
            if next <= value || next.partial_cmp(&value).is_none() {
                return Err(ConfigError::StalledRange {
                    value: Into::<Value>::into(value).to_string(),
                });
            }
            value = next;
        }
        self.set_values(values)
    }

    /// Private copy of this axis's template for `slot`
    #[must_use]
    pub fn private_path(&self, slot: usize) -> PathBuf {
        private_path(&self.template, slot)
    }

    /// Rewrite the private copy owned by `slot` so every site holds its value
    /// from `tuple`.
    ///
    /// Sites are applied in registration order, each over the output of the
    /// previous one, and the result is written back whole.
    pub fn rewrite(&self, tuple: &[Value], slot: usize) -> Result<()> {
        if tuple.len() != self.sites.len() {
            return Err(ConfigError::TupleArity {
                template: self.template.clone(),
                expected: self.sites.len(),
                found: tuple.len(),
            }
            .into());
        }

        let path = self.private_path(slot);
        let mut text = fs::read_to_string(&path).map_err(|e| SweepError::io(&path, e))?;
        for (site, value) in self.sites.iter().zip(tuple) {
            if !site.can_rewrite(&text) {
                return Err(ConfigError::NothingToRewrite {
                    pattern: site.pattern().to_string(),
                    path,
                }
                .into());
            }
            text = site.substitute(&text, value).into_owned();
        }
        fs::write(&path, text).map_err(|e| SweepError::io(&path, e))
    }
}
