// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Template sandbox.
//!
//! Section markdown and project templates are author-controlled, while the
//! contexts they render against are built by the host and can carry
//! [`Lambda`](crate::value::Lambda)s. The sandbox sits in front of the
//! evaluator and:
//!
//! 1. rewrites every tag whose key is, or walks through, a `__`-prefixed
//!    segment to [`SENTINEL`] before the template is compiled, so the
//!    context is never consulted for it;
//! 2. replaces every invocable value in the evaluator's context with
//!    [`SENTINEL`] before rendering, whatever key it sits under.
//!
//! Blocked lookups are silent: they render the sentinel and are never
//! reported as errors.

use mustache::Data;

use crate::template::{self, TemplateError};
use crate::value::Value;

/// Rendered in place of any blocked lookup.
pub const SENTINEL: &str = "[sandboxed]";

/// True for `__class__`, `a.__init__`, `a.b.__dict__.c`, ...
pub fn is_introspection_key(key: &str) -> bool {
    key.split('.').any(|segment| segment.starts_with("__"))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Sandbox;

impl Sandbox {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, source: &str, context: &Value) -> Result<String, TemplateError> {
        let source = template::rewrite(source, |key| {
            is_introspection_key(key).then(|| SENTINEL.to_string())
        })?;
        let mut data = template::to_data(context);
        seal(&mut data);
        template::evaluate(&source, &data)
    }
}

/// Replace every [`Data::Fun`] reachable from `data` with the sentinel.
fn seal(data: &mut Data) {
    match data {
        Data::Vec(items) => items.iter_mut().for_each(seal),
        Data::Map(map) => {
            for (key, value) in map.iter_mut() {
                if !matches!(value, Data::Fun(_)) {
                    seal(value);
                } else if template::is_section_key(key) {
                    *value = template::section(&Value::from(SENTINEL));
                } else {
                    *value = Data::String(SENTINEL.to_string());
                }
            }
        }
        _ => {}
    }
}
