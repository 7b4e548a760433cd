use crate::models::{GeoFeatures, Region, RegionBands};

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Central business district reference point (Raffles Place)
const CBD: (f64, f64) = (1.2839, 103.8515);

/// Approximate centroid per postal district, indexed by district - 1
const DISTRICT_CENTROIDS: [(f64, f64); 28] = [
    (1.2839, 103.8510), // 1  Raffles Place / Marina
    (1.2770, 103.8450), // 2  Tanjong Pagar
    (1.2897, 103.8100), // 3  Queenstown / Tiong Bahru
    (1.2650, 103.8220), // 4  Telok Blangah / HarbourFront
    (1.3040, 103.7650), // 5  Pasir Panjang / Clementi
    (1.2905, 103.8520), // 6  City Hall
    (1.3000, 103.8560), // 7  Bugis / Beach Road
    (1.3110, 103.8540), // 8  Little India
    (1.3050, 103.8320), // 9  Orchard
    (1.3130, 103.8070), // 10 Bukit Timah / Holland
    (1.3210, 103.8390), // 11 Novena / Newton
    (1.3270, 103.8550), // 12 Balestier / Toa Payoh
    (1.3320, 103.8680), // 13 Macpherson / Braddell
    (1.3200, 103.8900), // 14 Geylang / Eunos
    (1.3030, 103.9020), // 15 Katong / Marine Parade
    (1.3210, 103.9330), // 16 Bedok / Upper East Coast
    (1.3570, 103.9880), // 17 Changi / Loyang
    (1.3520, 103.9440), // 18 Tampines / Pasir Ris
    (1.3620, 103.8850), // 19 Serangoon / Hougang
    (1.3540, 103.8330), // 20 Ang Mo Kio / Bishan
    (1.3400, 103.7770), // 21 Upper Bukit Timah
    (1.3330, 103.7430), // 22 Jurong
    (1.3770, 103.7640), // 23 Bukit Panjang / Choa Chu Kang
    (1.3830, 103.7090), // 24 Lim Chu Kang / Tengah
    (1.4410, 103.7690), // 25 Woodlands / Kranji
    (1.3900, 103.8260), // 26 Upper Thomson
    (1.4290, 103.8360), // 27 Yishun / Sembawang
    (1.3950, 103.8750), // 28 Seletar
];

/// Major reference transit points used for proximity features
const TRANSIT_POINTS: [(&str, f64, f64); 14] = [
    ("Raffles Place", 1.2840, 103.8515),
    ("City Hall", 1.2931, 103.8520),
    ("Dhoby Ghaut", 1.2993, 103.8455),
    ("Orchard", 1.3043, 103.8320),
    ("Newton", 1.3124, 103.8384),
    ("Outram Park", 1.2803, 103.8397),
    ("HarbourFront", 1.2653, 103.8220),
    ("Buona Vista", 1.3071, 103.7903),
    ("Bishan", 1.3510, 103.8485),
    ("Serangoon", 1.3498, 103.8735),
    ("Paya Lebar", 1.3177, 103.8926),
    ("Tampines", 1.3536, 103.9451),
    ("Jurong East", 1.3330, 103.7422),
    ("Woodlands", 1.4370, 103.7865),
];

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in kilometers
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Extract a 6-digit postal code embedded in an address string
pub fn extract_postal_code(address: &str) -> Option<&str> {
    let bytes = address.as_bytes();
    let mut start = None;
    let mut run = 0usize;

    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            if run == 0 {
                start = Some(i);
            }
            run += 1;
        } else {
            if run == 6 {
                break;
            }
            run = 0;
            start = None;
        }
    }

    if run == 6 {
        start.map(|s| &address[s..s + 6])
    } else {
        None
    }
}

/// Map a 2-digit postal sector to its postal district
pub fn sector_to_district(sector: u8) -> Option<u8> {
    let district = match sector {
        1..=6 => 1,
        7..=8 => 2,
        14..=16 => 3,
        9..=10 => 4,
        11..=13 => 5,
        17 => 6,
        18..=19 => 7,
        20..=21 => 8,
        22..=23 => 9,
        24..=27 => 10,
        28..=30 => 11,
        31..=33 => 12,
        34..=37 => 13,
        38..=41 => 14,
        42..=45 => 15,
        46..=48 => 16,
        49..=50 | 81 => 17,
        51..=52 => 18,
        53..=55 | 82 => 19,
        56..=57 => 20,
        58..=59 => 21,
        60..=64 => 22,
        65..=68 => 23,
        69..=71 => 24,
        72..=73 => 25,
        77..=78 => 26,
        75..=76 => 27,
        79..=80 => 28,
        _ => return None,
    };
    Some(district)
}

/// Postal district for an address, falling back to district 1 when no usable
/// postal code is present
pub fn district_from_address(address: &str) -> u8 {
    extract_postal_code(address)
        .and_then(|code| code[..2].parse::<u8>().ok())
        .and_then(sector_to_district)
        .unwrap_or(1)
}

/// Geospatial feature calculator
///
/// Approximates coordinates from the postal district and derives all
/// proximity-based features. Always returns a best-effort result; an address
/// with no recognizable postal code resolves to district 1.
#[derive(Debug, Clone)]
pub struct GeoFeatureCalculator {
    bands: RegionBands,
}

impl GeoFeatureCalculator {
    pub fn new(bands: RegionBands) -> Self {
        Self { bands }
    }

    /// Compute geospatial features for an address, optionally overriding the
    /// district extraction with an explicit postal district.
    pub fn compute(&self, address: &str, district_override: Option<u8>) -> GeoFeatures {
        let district = district_override
            .filter(|d| (1..=28).contains(d))
            .unwrap_or_else(|| district_from_address(address));

        let (lat, lon) = DISTRICT_CENTROIDS[usize::from(district) - 1];

        let mut min_transit_km = f64::MAX;
        let mut transit_count_1km = 0u32;
        for (_, t_lat, t_lon) in TRANSIT_POINTS {
            let d = haversine_distance(lat, lon, t_lat, t_lon);
            if d < min_transit_km {
                min_transit_km = d;
            }
            if d <= 1.0 {
                transit_count_1km += 1;
            }
        }

        let cbd_km = haversine_distance(lat, lon, CBD.0, CBD.1);
        let accessibility_score =
            1.0 / (min_transit_km + 0.1) + 0.5 * f64::from(transit_count_1km);
        let region = self.bands.classify(district);
        let prestige_score = prestige_score(district, region);

        GeoFeatures {
            latitude: lat,
            longitude: lon,
            postal_district: district,
            min_transit_km,
            transit_count_1km,
            cbd_km,
            accessibility_score,
            region,
            prestige_score,
        }
    }

    /// Re-classify a district under a different band convention, used when a
    /// model artifact was trained with non-default bands.
    pub fn classify_with(&self, district: u8, bands: Option<&RegionBands>) -> Region {
        bands.unwrap_or(&self.bands).classify(district)
    }
}

impl Default for GeoFeatureCalculator {
    fn default() -> Self {
        Self::new(RegionBands::default())
    }
}

/// Location prestige on a 0-1 scale, from district tier and region
fn prestige_score(district: u8, region: Region) -> f64 {
    // Prime commercial and residential districts
    const PRIME_DISTRICTS: [u8; 6] = [1, 2, 6, 9, 10, 11];

    if PRIME_DISTRICTS.contains(&district) {
        return 1.0;
    }
    match region {
        Region::CentralCore => 0.8,
        Region::RestCentral => 0.6,
        Region::CityFringe => 0.4,
        Region::OutsideCentral => 0.25,
    }
}
