use promptly::{prompt, prompt_default};

use cinemap_core::coordinates::{parse_coordinates, Coordinates};

use crate::config::HomeLocation;

pub fn ask_home() -> anyhow::Result<HomeLocation> {
    if prompt_default("Do you want to find your location by name?", true)? {
        let address: String = prompt("Enter your current location in English")?;
        return Ok(HomeLocation::Address(address));
    }
    Ok(HomeLocation::Coords(ask_coordinates()?))
}

/// Asks until the answer parses.
pub fn ask_coordinates() -> anyhow::Result<Coordinates> {
    loop {
        let answer: String = prompt("Please enter your current latitude and longitude")?;
        match parse_coordinates(&answer) {
            Ok(coords) => return Ok(coords),
            Err(err) => eprintln!("{}", err),
        }
    }
}
