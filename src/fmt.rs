fn group_thousands(int_part: &str) -> String {
    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    grouped.chars().rev().collect()
}

/// Format a number Brazilian style with a fixed number of decimals: 1.234,56
fn decimal(val: f64, places: usize) -> String {
    let negative = val < 0.0;
    let fixed = format!("{:.*}", places, val.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let mut out = String::new();
    // "-0,00" would be noise
    if negative && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if !dec_part.is_empty() {
        out.push(',');
        out.push_str(dec_part);
    }
    out
}

/// Format a float as reais: R$ 1.234,56
pub fn money(val: f64) -> String {
    let s = decimal(val, 2);
    match s.strip_prefix('-') {
        Some(abs) => format!("-R$ {abs}"),
        None => format!("R$ {s}"),
    }
}

pub fn money_opt(val: Option<f64>) -> String {
    val.map(money).unwrap_or_else(|| "\u{2014}".to_string())
}

/// Format a quantity, dropping the fraction when it is whole: 1.234 or 2,5
pub fn qty(val: f64) -> String {
    let s = decimal(val, 3);
    match s.split_once(',') {
        Some((int_part, dec_part)) => {
            let dec_part = dec_part.trim_end_matches('0');
            if dec_part.is_empty() {
                int_part.to_string()
            } else {
                format!("{int_part},{dec_part}")
            }
        }
        None => s,
    }
}

/// Format a 0..1 ratio as a percentage: 45,0%
pub fn pct(ratio: f64) -> String {
    format!("{}%", decimal(ratio * 100.0, 1))
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "R$ 1.234,56");
        assert_eq!(money(-500.00), "-R$ 500,00");
        assert_eq!(money(0.0), "R$ 0,00");
        assert_eq!(money(1000000.99), "R$ 1.000.000,99");
        assert_eq!(money(42.10), "R$ 42,10");
        assert_eq!(money(-0.001), "R$ 0,00");
        assert_eq!(money_opt(None), "\u{2014}");
    }

    #[test]
    fn test_qty_formatting() {
        assert_eq!(qty(1234.0), "1.234");
        assert_eq!(qty(2.5), "2,5");
        assert_eq!(qty(-3.0), "-3");
        assert_eq!(qty(0.125), "0,125");
        assert_eq!(qty(0.0), "0");
    }

    #[test]
    fn test_pct_formatting() {
        assert_eq!(pct(0.5), "50,0%");
        assert_eq!(pct(0.0), "0,0%");
        assert_eq!(pct(1.0), "100,0%");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
