use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use ustr::Ustr;

use cinemap_core::coordinates::Coordinates;

pub const FILMS_LAYER: &str = "Closest films";
pub const HOME_LAYER: &str = "Your location";
const ZOOM_START: u8 = 10;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot encode map data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot write map to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub coords: Coordinates,
    pub titles: Vec<Ustr>,
}

impl Marker {
    pub fn label(&self) -> String {
        self.titles
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Serialize)]
struct MarkerJson {
    lat: f64,
    lon: f64,
    label: String,
}

/// A Leaflet page with one layer of film markers and one with the user's position.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDocument {
    pub home: Coordinates,
    pub markers: Vec<Marker>,
}

impl MapDocument {
    pub fn new(home: Coordinates) -> Self {
        Self {
            home,
            markers: vec![],
        }
    }

    pub fn render(&self) -> Result<String, RenderError> {
        let markers = self
            .markers
            .iter()
            .map(|m| MarkerJson {
                lat: m.coords.lat,
                lon: m.coords.lon,
                label: m.label(),
            })
            .collect::<Vec<_>>();
        let html = TEMPLATE
            .replace("{{FILMS_LAYER}}", &script_json(&FILMS_LAYER)?)
            .replace("{{HOME_LAYER}}", &script_json(&HOME_LAYER)?)
            .replace("{{HOME}}", &script_json(&self.home)?)
            .replace("{{ZOOM}}", &ZOOM_START.to_string())
            .replace("{{MARKERS}}", &script_json(&markers)?);
        Ok(html)
    }

    pub fn save(&self, path: &Path) -> Result<(), RenderError> {
        let html = self.render()?;
        fs::write(path, html).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// JSON that can sit inside a `<script>` element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1.0" />
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map { width: 100%; height: 100%; margin: 0; padding: 0; }</style>
</head>
<body>
<div id="map"></div>
<script>
var home = {{HOME}};
var markers = {{MARKERS}};
var map = L.map("map").setView([home.lat, home.lon], {{ZOOM}});
L.tileLayer("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png", {
    maxZoom: 19,
    attribution: "&copy; OpenStreetMap contributors"
}).addTo(map);

function popup(text, width) {
    var div = document.createElement("div");
    div.textContent = text;
    return L.popup({minWidth: width, maxWidth: width}).setContent(div);
}

var films = L.featureGroup();
markers.forEach(function (m) {
    L.marker([m.lat, m.lon]).bindPopup(popup(m.label, 500)).addTo(films);
});
films.addTo(map);

var you = L.featureGroup();
L.circleMarker([home.lat, home.lon], {color: "red", fillColor: "red", fillOpacity: 0.8, radius: 9})
    .bindPopup(popup("Your Location", 100))
    .addTo(you);
you.addTo(map);

var overlays = {};
overlays[{{FILMS_LAYER}}] = films;
overlays[{{HOME_LAYER}}] = you;
L.control.layers(null, overlays).addTo(map);
</script>
</body>
</html>
"#;
