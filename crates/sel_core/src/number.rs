//! Number formatting shared by style writers and color formatting

/// Format a number the way CSS serializes it: no trailing `.0`, at most
/// three decimals, and never `-0`.
pub fn format_number(value: f32) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{}", rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-0.0001), "0");
        assert_eq!(format_number(1.23456), "1.235");
        assert_eq!(format_number(-42.5), "-42.5");
    }
}
