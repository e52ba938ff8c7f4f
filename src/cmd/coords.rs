/*!
coords.rs

Parsing of `<lon>,<lat>` coordinate arguments (`--nearby`, `--setpoint`).

Only the structure is checked here: exactly two non-empty tokens separated by
a single comma. Numeric parsing is left to the server, so the tokens are kept
as the user typed them (minus surrounding whitespace).
*/

use std::fmt;

use super::error::ToolError;

/// A longitude / latitude pair, held as the raw tokens supplied on the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinate {
    pub lon: String,
    pub lat: String,
}

impl Coordinate {
    /// Parse a `"lon,lat"` token.
    pub fn parse(raw: &str) -> Result<Self, ToolError> {
        let malformed = || ToolError::MalformedCoordinate {
            raw: raw.to_string(),
        };

        let mut parts = raw.split(',');
        let (Some(lon), Some(lat), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };

        let (lon, lat) = (lon.trim(), lat.trim());
        if lon.is_empty() || lat.is_empty() {
            return Err(malformed());
        }

        Ok(Coordinate {
            lon: lon.to_string(),
            lat: lat.to_string(),
        })
    }

    /// Arguments for a Tile38 `POINT` clause, which expects latitude first.
    pub fn point_args(&self) -> [String; 2] {
        [self.lat.clone(), self.lon.clone()]
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lon, self.lat)
    }
}
