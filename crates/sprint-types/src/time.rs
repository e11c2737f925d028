use chrono::Utc;

/// Compact UTC timestamp used in every published document: `YYYY-MM-DDTHH:MM:SSZ`.
pub fn now_utc_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_iso_shape() {
        let ts = now_utc_iso();
        assert_eq!(ts.len(), 20);
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[10..11], "T");
    }
}
