use std::fmt;
use std::num::ParseFloatError;
use std::str::FromStr;

use nom::branch::alt;
use nom::character::complete::{char, digit1, multispace0, multispace1, satisfy};
use nom::combinator::{all_consuming, map, map_res, opt, recognize};
use nom::multi::count;
use nom::number::complete::double;
use nom::sequence::{delimited, tuple};
use nom::{AsChar, IResult};
use serde::Serialize;

use crate::error::CoordinatesError;

// north and east are positive numbers
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinatesError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinatesError::LatitudeRange(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinatesError::LongitudeRange(lon));
        }
        Ok(Self { lat, lon })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

impl FromStr for Coordinates {
    type Err = CoordinatesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_coordinates(s)
    }
}

/// Accepts `49.817545, 24.023932` (comma optional) or `4949N 02401E`.
pub fn parse_coordinates(s: &str) -> Result<Coordinates, CoordinatesError> {
    let (_, (lat, lon)) = all_consuming(delimited(
        multispace0,
        alt((decimal_parser, deg_min_parser)),
        multispace0,
    ))(s)
    .map_err(|_| CoordinatesError::Syntax(s.to_string()))?;
    Coordinates::new(lat, lon)
}

fn decimal_parser(i: &str) -> IResult<&str, (f64, f64)> {
    let (i, (lat, _, _, _, lon)) = tuple((
        double,
        multispace0,
        opt(char(',')),
        multispace0,
        double,
    ))(i)?;
    Ok((i, (lat, lon)))
}

fn deg_min_parser(i: &str) -> IResult<&str, (f64, f64)> {
    let separator = alt((
        map(tuple((multispace0, char(','), multispace0)), |_| ()),
        map(multispace1, |_| ()),
    ));
    let (i, (lat, bearing, _)) =
        tuple((deg_min(2), alt((char('N'), char('S'))), separator))(i)?;
    let lat = match bearing {
        'S' => -lat,
        _ => lat,
    };
    let (i, (lon, bearing)) = tuple((deg_min(3), alt((char('E'), char('W')))))(i)?;
    let lon = match bearing {
        'W' => -lon,
        _ => lon,
    };
    Ok((i, (lat, lon)))
}

/// `width` digits of whole degrees followed by whole minutes.
fn deg_min(width: usize) -> impl FnMut(&str) -> IResult<&str, f64> {
    move |i| {
        map_res(
            tuple((
                recognize(count(satisfy(|c| c.is_dec_digit()), width)),
                digit1,
            )),
            |(deg, min)| float_from_deg_min(deg, min),
        )(i)
    }
}

fn float_from_deg_min(deg: &str, min: &str) -> Result<f64, ParseFloatError> {
    Ok(f64::from_str(deg)? + f64::from_str(min)? / 60.0_f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_pair() {
        assert_eq!(
            parse_coordinates("49.817545, 24.023932"),
            Ok(Coordinates { lat: 49.817545, lon: 24.023932 })
        );
        assert_eq!(
            parse_coordinates(" -33.86 151.2 "),
            Ok(Coordinates { lat: -33.86, lon: 151.2 })
        );
    }

    #[test]
    fn degrees_and_minutes() {
        let c: Coordinates = "4930N 02400W".parse().unwrap();
        assert_eq!(c, Coordinates { lat: 49.5, lon: -24.0 });
        let c = parse_coordinates("3330S, 15115E").unwrap();
        assert_eq!(c, Coordinates { lat: -33.5, lon: 151.25 });
    }

    #[test]
    fn out_of_range() {
        assert_eq!(
            parse_coordinates("91, 10"),
            Err(CoordinatesError::LatitudeRange(91.0))
        );
        assert_eq!(
            parse_coordinates("10, -181"),
            Err(CoordinatesError::LongitudeRange(-181.0))
        );
    }

    #[test]
    fn garbage() {
        assert!(matches!(
            parse_coordinates("Lviv, Ukraine"),
            Err(CoordinatesError::Syntax(_))
        ));
        assert!(matches!(
            parse_coordinates("49.8, 24.0 extra"),
            Err(CoordinatesError::Syntax(_))
        ));
    }

    #[test]
    fn display_is_reverse_geocoder_input() {
        let c = Coordinates { lat: 49.5, lon: 24.25 };
        assert_eq!(c.to_string(), "49.5, 24.25");
    }
}
