pub mod codec;
pub mod config;
pub mod handle;
pub mod inspect;
pub mod perform;

use xcallback_core::Parameters;

/// Parse `KEY=VALUE` arguments. A later duplicate key replaces an earlier one.
pub fn parse_pairs(raw: &[String]) -> anyhow::Result<Parameters> {
    let mut params = Parameters::new();
    for pair in raw {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected KEY=VALUE, got '{pair}'"))?;
        if key.is_empty() {
            anyhow::bail!("empty key in '{pair}'");
        }
        params.insert(key.to_string(), value.to_string());
    }
    Ok(params)
}
