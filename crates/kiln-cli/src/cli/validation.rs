use kiln_pipeline::tasks;

/// Accept only declared task names.
pub fn parse_task(s: &str) -> Result<String, String> {
    if tasks::ALL.contains(&s) {
        Ok(s.to_string())
    } else {
        Err(format!(
            "Unknown task '{}'. Known tasks: {}",
            s,
            tasks::ALL.join(", ")
        ))
    }
}

/// A TCP port other than 0.
pub fn parse_port(s: &str) -> Result<u16, String> {
    let port: u16 = s
        .parse()
        .map_err(|_| format!("'{}' is not a port number", s))?;
    if port == 0 {
        return Err("Port must be between 1 and 65535".to_string());
    }
    Ok(port)
}
