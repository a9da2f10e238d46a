use miette::Result;
use serde_json::json;

pub fn run(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    if json {
        println!("{}", json!({ "version": version }));
    } else {
        println!("basalt {version}");
    }
    Ok(())
}
