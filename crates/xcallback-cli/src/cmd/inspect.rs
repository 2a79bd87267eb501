use crate::output::{print_json, print_params};
use xcallback_core::dispatch::classify;
use xcallback_core::Inbound;

pub fn run(url: &str, json: bool) -> anyhow::Result<()> {
    let inbound = classify(url);

    if json {
        match &inbound {
            Ok(inbound) => print_json(inbound)?,
            Err(reason) => print_json(&serde_json::json!({
                "kind": "ignored",
                "reason": reason,
            }))?,
        }
        return Ok(());
    }

    match inbound {
        Ok(Inbound::Response(r)) => {
            println!("response   {}", r.response_type);
            println!("request    {}", r.request_id);
            println!();
            print_params(&r.params);
        }
        Ok(Inbound::Request(r)) => {
            println!("request    {}", r.action);
            let callbacks = [
                ("x-success", &r.success),
                ("x-error", &r.error),
                ("x-cancel", &r.cancel),
                ("x-source", &r.source),
            ];
            for (key, value) in callbacks {
                if let Some(v) = value {
                    println!("{key:<10} {v}");
                }
            }
            println!();
            print_params(&r.params);
        }
        Err(reason) => println!("ignored: {reason}"),
    }
    Ok(())
}
