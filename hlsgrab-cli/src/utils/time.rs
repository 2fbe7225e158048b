use crate::error::AppError;

/// Parse a time offset in seconds.
///
/// Accepts plain seconds (`90`, `12.5`), a unit suffix (`90s`, `30m`, `1.5h`)
/// or clock form (`MM:SS`, `HH:MM:SS`, fractional seconds allowed).
pub fn parse_time(time_str: &str) -> Result<f64, AppError> {
    let time_str = time_str.trim();
    if time_str.is_empty() {
        return Err(AppError::ParseError("Invalid format: empty string".to_string()));
    }

    let seconds = if time_str.contains(':') {
        parse_clock(time_str)?
    } else if let Ok(seconds) = time_str.parse::<f64>() {
        seconds
    } else {
        parse_with_unit(time_str)?
    };

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(AppError::ParseError(format!(
            "Invalid time '{time_str}': must be a non-negative number of seconds"
        )));
    }
    Ok(seconds)
}

fn parse_with_unit(time_str: &str) -> Result<f64, AppError> {
    let split_index = time_str
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(time_str.len());

    let (numeric_part, unit_part) = time_str.split_at(split_index);
    let value = numeric_part
        .parse::<f64>()
        .map_err(|_| AppError::ParseError(format!("Invalid number in '{time_str}'")))?;

    match unit_part.trim().to_lowercase().as_str() {
        "s" => Ok(value),
        "m" => Ok(value * 60.0),
        "h" => Ok(value * 3600.0),
        unit => Err(AppError::ParseError(format!("Invalid unit '{unit}'"))),
    }
}

fn parse_clock(time_str: &str) -> Result<f64, AppError> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() > 3 {
        return Err(AppError::ParseError(format!(
            "Invalid clock time '{time_str}': expected MM:SS or HH:MM:SS"
        )));
    }

    let mut seconds = 0.0;
    for (position, part) in parts.iter().enumerate() {
        let is_last = position + 1 == parts.len();
        let value = if is_last {
            part.parse::<f64>().ok()
        } else {
            part.parse::<u32>().ok().map(f64::from)
        }
        .ok_or_else(|| AppError::ParseError(format!("Invalid clock time '{time_str}'")))?;

        if position > 0 && value >= 60.0 {
            return Err(AppError::ParseError(format!(
                "Invalid clock time '{time_str}': minutes and seconds must be below 60"
            )));
        }
        seconds = seconds * 60.0 + value;
    }
    Ok(seconds)
}

/// Convert seconds to a human-readable format
pub fn format_duration(seconds: f64) -> String {
    if seconds >= 3600.0 {
        format!("{:.2}h", seconds / 3600.0)
    } else if seconds >= 60.0 {
        format!("{:.2}m", seconds / 60.0)
    } else {
        format!("{seconds:.2}s")
    }
}
