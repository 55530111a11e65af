use fnapi_core::api_list::ApiList;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Print the endpoint list as an aligned two-column table.
pub fn print_api_list(list: &ApiList) {
    let entries = list.entries();
    let width = entries
        .iter()
        .map(|(k, _)| k.len())
        .max()
        .unwrap_or(0)
        .max("ENDPOINT".len());

    println!("{:width$}  URL", "ENDPOINT");
    println!("{}  {}", "-".repeat(width), "-".repeat(3));
    for (key, url) in entries {
        println!("{key:width$}  {url}");
    }
}
