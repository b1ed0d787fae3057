//! Common utilities shared by the harness components

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use config::Config;
pub use error::{Error, Result};

/// Replace every `$$NAME$$` placeholder with its configured value.
///
/// Variable names are matched upper-cased, so `iface = "eth0"` in the
/// configuration fills `$$IFACE$$`.
pub fn substitute_vars<'a, I>(text: &str, vars: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut out = text.to_string();
    for (name, value) in vars {
        let placeholder = format!("$${}$$", name.to_uppercase());
        out = out.replace(&placeholder, value);
    }
    out
}
