//! Reference frame normalisation
//!
//! Layers exported from desktop GIS often keep their projected frame in a legacy
//! GeoJSON `crs` member, or in the `.prj` WKT next to a shapefile. Everything is brought back to WGS84 lon/lat degrees
//! before any geometric test. Only the frames used for this area are supported:
//! WGS84 itself, Web Mercator and UTM (north or south, any zone).

use geo::Coord;
use serde_json::Value as JsonValue;
use std::f64::consts::PI;

/// WGS84 semi-major axis (m)
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// UTM central scale factor
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Supported source frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// EPSG:4326 / OGC CRS84, lon/lat degrees
    Wgs84,
    /// EPSG:3857, spherical Mercator metres
    WebMercator,
    /// EPSG:326zz (north) / EPSG:327zz (south)
    Utm { zone: u8, north: bool },
}

impl Crs {
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(Crs::Wgs84),
            3857 | 3785 | 900913 => Some(Crs::WebMercator),
            32601..=32660 => Some(Crs::Utm { zone: (code - 32600) as u8, north: true }),
            32701..=32760 => Some(Crs::Utm { zone: (code - 32700) as u8, north: false }),
            _ => None,
        }
    }

    /// Parse a CRS name such as `EPSG:32642`, `urn:ogc:def:crs:EPSG::3857`
    /// or `urn:ogc:def:crs:OGC:1.3:CRS84`
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Some(Crs::Wgs84);
        }
        if !upper.contains("EPSG") {
            return None;
        }
        upper
            .rsplit(':')
            .next()
            .and_then(|code| code.trim().parse::<u32>().ok())
            .and_then(Crs::from_epsg)
    }

    /// Parse an ESRI `.prj` / OGC WKT1 definition
    ///
    /// The outermost `AUTHORITY["EPSG", ...]` wins when present. Otherwise the
    /// definition name is matched (`WGS_1984_UTM_Zone_42N`, `WGS 84 / UTM zone 42N`,
    /// `WGS_1984_Web_Mercator_Auxiliary_Sphere`, `GCS_WGS_1984`). Other datums
    /// are not supported.
    pub fn from_wkt(wkt: &str) -> Option<Self> {
        let upper = wkt.trim().to_ascii_uppercase();

        let projected = upper.starts_with("PROJCS");
        let authority = outer_epsg_authority(&upper)
            .and_then(Crs::from_epsg)
            .filter(|crs| !(projected && crs.is_geographic()));
        if authority.is_some() {
            return authority;
        }

        let open = upper.find('"')? + 1;
        let close = open + upper[open..].find('"')?;
        let name: String = upper[open..close].chars().filter(char::is_ascii_alphanumeric).collect();

        if !(name.contains("WGS84") || name.contains("WGS1984")) {
            return None;
        }
        if upper.starts_with("GEOGCS") {
            return Some(Crs::Wgs84);
        }
        if name.contains("PSEUDOMERCATOR") || name.contains("WEBMERCATOR") {
            return Some(Crs::WebMercator);
        }

        let zone_spec = &name[name.find("UTMZONE")? + "UTMZONE".len()..];
        let digits = zone_spec.chars().take_while(char::is_ascii_digit).count();
        let zone: u8 = zone_spec[..digits].parse().ok().filter(|z| (1..=60).contains(z))?;
        match zone_spec[digits..].chars().next()? {
            'N' => Some(Crs::Utm { zone, north: true }),
            'S' => Some(Crs::Utm { zone, north: false }),
            _ => None,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Wgs84)
    }

    /// Convert one coordinate to WGS84 lon/lat degrees
    pub fn to_wgs84(&self, c: Coord<f64>) -> Coord<f64> {
        match *self {
            Crs::Wgs84 => c,
            Crs::WebMercator => web_mercator_to_wgs84(c),
            Crs::Utm { zone, north } => utm_to_wgs84(c, zone, north),
        }
    }
}

/// Declared frame of a FeatureCollection's legacy `crs` member
///
/// `Ok(None)` when no member is present (RFC 7946 default: WGS84).
/// `Err(name)` when a frame is declared that we cannot handle.
pub fn declared_crs(crs_member: Option<&JsonValue>) -> Result<Option<Crs>, String> {
    let Some(member) = crs_member else {
        return Ok(None);
    };

    let name = member
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(JsonValue::as_str)
        .ok_or_else(|| member.to_string())?;

    Crs::from_name(name).map(Some).ok_or_else(|| name.to_string())
}

// In WKT1 the outer definition's AUTHORITY is the last one in the text
fn outer_epsg_authority(upper_wkt: &str) -> Option<u32> {
    const MARKER: &str = "AUTHORITY[\"EPSG\",";
    let start = upper_wkt.rfind(MARKER)? + MARKER.len();
    upper_wkt[start..]
        .trim_start()
        .trim_start_matches('"')
        .split(|c| c == '"' || c == ']')
        .next()?
        .trim()
        .parse()
        .ok()
}

fn web_mercator_to_wgs84(c: Coord<f64>) -> Coord<f64> {
    let lon = (c.x / WGS84_A).to_degrees();
    let lat = (2.0 * (c.y / WGS84_A).exp().atan() - PI / 2.0).to_degrees();
    Coord { x: lon, y: lat }
}

/// Inverse transverse Mercator (Snyder, USGS PP 1395, eqs. 8-18 .. 8-25)
fn utm_to_wgs84(c: Coord<f64>, zone: u8, north: bool) -> Coord<f64> {
    let e2 = WGS84_F * (2.0 - WGS84_F);
    let ep2 = e2 / (1.0 - e2);
    let sqrt_1_e2 = (1.0 - e2).sqrt();
    let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);

    let x = c.x - UTM_FALSE_EASTING;
    let y = if north { c.y } else { c.y - UTM_FALSE_NORTHING_SOUTH };

    let m = y / UTM_K0;
    let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin_phi1, cos_phi1) = phi1.sin_cos();
    let tan_phi1 = phi1.tan();

    let n1 = WGS84_A / (1.0 - e2 * sin_phi1.powi(2)).sqrt();
    let t1 = tan_phi1.powi(2);
    let c1 = ep2 * cos_phi1.powi(2);
    let r1 = WGS84_A * (1.0 - e2) / (1.0 - e2 * sin_phi1.powi(2)).powf(1.5);
    let d = x / (n1 * UTM_K0);

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d.powi(2) / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1.powi(2) - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1.powi(2) - 252.0 * ep2 - 3.0 * c1.powi(2))
                    * d.powi(6)
                    / 720.0);

    let central_meridian = (f64::from(zone) * 6.0 - 183.0).to_radians();
    let lon = central_meridian
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1.powi(2) + 8.0 * ep2 + 24.0 * t1.powi(2)) * d.powi(5)
                / 120.0)
            / cos_phi1;

    Coord {
        x: lon.to_degrees(),
        y: lat.to_degrees(),
    }
}
