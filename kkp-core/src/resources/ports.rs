use std::{fmt, str::FromStr};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortRangeError {
    #[error("empty port range")]
    Empty,
    #[error("'{}' is not a valid port", .0)]
    InvalidPort(String),
    #[error("end port of '{}' is lower than its start", .0)]
    Inverted(String),
}

/// Inclusive range of ports, written as `30000-32767`, `30000+2767` or a single port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub base: u16,
    pub size: u32,
}

impl PortRange {
    pub fn low(&self) -> u16 {
        self.base
    }

    pub fn high(&self) -> u16 {
        // size is at least 1 and base + size - 1 never exceeds u16::MAX after parsing
        (u32::from(self.base) + self.size - 1) as u16
    }
}

impl FromStr for PortRange {
    type Err = PortRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(PortRangeError::Empty);
        }

        let parse_port = |value: &str| {
            value
                .trim()
                .parse::<u16>()
                .map_err(|_| PortRangeError::InvalidPort(value.to_owned()))
        };

        let (low, high) = if let Some((low, high)) = raw.split_once('-') {
            (parse_port(low)?, parse_port(high)?)
        } else if let Some((low, offset)) = raw.split_once('+') {
            let low = parse_port(low)?;
            let offset = parse_port(offset)?;
            let high = low
                .checked_add(offset)
                .ok_or_else(|| PortRangeError::InvalidPort(raw.to_owned()))?;
            (low, high)
        } else {
            let port = parse_port(raw)?;
            (port, port)
        };

        if high < low {
            return Err(PortRangeError::Inverted(raw.to_owned()));
        }

        Ok(Self {
            base: low,
            size: u32::from(high - low) + 1,
        })
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low(), self.high())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dash_plus_and_single_forms() {
        let dash: PortRange = "30000-32767".parse().unwrap();
        let plus: PortRange = "30000+2767".parse().unwrap();
        let single: PortRange = "8080".parse().unwrap();

        assert_eq!((dash.low(), dash.high()), (30000, 32767));
        assert_eq!(dash, plus);
        assert_eq!((single.low(), single.high()), (8080, 8080));
        assert_eq!(dash.to_string(), "30000-32767");
    }

    #[test]
    fn rejects_invalid_ranges() {
        assert_eq!("".parse::<PortRange>(), Err(PortRangeError::Empty));
        assert_eq!(
            "32767-30000".parse::<PortRange>(),
            Err(PortRangeError::Inverted("32767-30000".to_owned()))
        );
        assert!("30000-70000".parse::<PortRange>().is_err());
        assert!("65000+1000".parse::<PortRange>().is_err());
        assert!("abc".parse::<PortRange>().is_err());
    }
}
