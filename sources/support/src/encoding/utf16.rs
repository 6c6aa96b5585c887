use anyhow::Result;

pub fn to_utf16(str: &str) -> Vec<u16> {
    str.encode_utf16().collect()
}

pub fn from_utf16(units: &[u16]) -> Result<String> {
    Ok(String::from_utf16(units)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_surrogates() {
        let units = to_utf16("a\u{1F600}");
        assert_eq!(units.len(), 3);
        assert_eq!(from_utf16(&units).unwrap(), "a\u{1F600}");
    }
}
