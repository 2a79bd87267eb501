use crate::cmd::parse_pairs;
use crate::output::{print_json, print_params};
use xcallback_core::query;

pub fn encode(raw: &[String], json: bool) -> anyhow::Result<()> {
    let params = parse_pairs(raw)?;
    let encoded = query::encode(&params);
    if json {
        print_json(&serde_json::json!({ "query": encoded }))?;
    } else {
        println!("{encoded}");
    }
    Ok(())
}

pub fn decode(raw: &str, json: bool) -> anyhow::Result<()> {
    let params = query::decode(raw);
    if json {
        print_json(&params)?;
    } else {
        print_params(&params);
    }
    Ok(())
}
