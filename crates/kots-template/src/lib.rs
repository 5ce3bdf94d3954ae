//! Kots Template - the static template function library
//!
//! Upstream manifests may contain template expressions that are evaluated
//! before the files reach the render pipeline. This crate provides a
//! MiniJinja environment with the kots function set:
//! - String helpers (`ToUpper`, `Trim`, `Split`, `UrlEncode`, ...)
//! - Encoding (`Base64Encode`, `Base64Decode`)
//! - Arithmetic over tagged numbers (`Add`, `Sub`, `Mult`, `Div`)
//! - Parsing (`ParseBool`, `ParseInt`, ...) and `HumanSize`
//! - Non-deterministic helpers (`Now`, `NowFmt`, `RandomString`)
//!
//! Expressions are written `repl{{ ToUpper("x") }}`; plain `{{ }}` is
//! literal text.

pub mod engine;
pub mod error;
pub mod functions;
pub mod number;

pub use engine::{Engine, EngineBuilder, FUNCTION_NAMES};
pub use error::{EngineError, Result, TemplateError};
pub use number::{Number, Op};
