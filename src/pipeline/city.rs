use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use super::types::{CityStat, CustomerDim, JoinedTables};

#[derive(Debug, Default, Clone, Copy)]
struct CityTotals {
    weight_kg: f64,
    weight_cubic: f64,
    goods_value: f64,
}

/// Distinct customers per (city, latitude, longitude), coordinates ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct CityLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub customers: usize,
}

/// Groups customers by city and coordinate pair. Customers missing a city or
/// either coordinate are left out.
pub fn city_locations(customers: &[CustomerDim]) -> BTreeMap<String, Vec<CityLocation>> {
    let mut distinct: BTreeMap<String, Vec<(f64, f64, BTreeSet<&str>)>> = BTreeMap::new();
    for c in customers {
        let (Some(city), Some(lat), Some(lon)) = (&c.city, c.latitude, c.longitude) else {
            continue;
        };
        let places = distinct.entry(city.clone()).or_default();
        match places.iter_mut().find(|(la, lo, _)| *la == lat && *lo == lon) {
            Some((_, _, ids)) => {
                ids.insert(c.customer_id.as_str());
            }
            None => places.push((lat, lon, BTreeSet::from([c.customer_id.as_str()]))),
        }
    }

    distinct
        .into_iter()
        .map(|(city, mut places)| {
            places.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
            let locations = places
                .into_iter()
                .map(|(latitude, longitude, ids)| CityLocation {
                    latitude,
                    longitude,
                    customers: ids.len(),
                })
                .collect();
            (city, locations)
        })
        .collect()
}

/// Freight totals per city, left-joined with the customer coordinates.
///
/// Returns an empty table when no joined source carried a City column. A city
/// with several coordinate pairs yields one row per pair; a city without any
/// yields a single row with empty coordinates.
pub fn city_stats(joined: &JoinedTables, customers: &[CustomerDim]) -> Vec<CityStat> {
    if !joined.has_city {
        info!("No City column in freight data, city statistics skipped");
        return Vec::new();
    }

    let mut totals: BTreeMap<&str, CityTotals> = BTreeMap::new();
    for row in &joined.freight {
        let Some(city) = row.city.as_deref() else { continue };
        let t = totals.entry(city).or_default();
        t.weight_kg += row.record.weight_kg;
        t.weight_cubic += row.record.weight_cubic;
        t.goods_value += row.record.goods_value;
    }

    let locations = city_locations(customers);

    let mut stats = Vec::with_capacity(totals.len());
    for (city, t) in totals {
        let base = CityStat {
            city: city.to_string(),
            weight_kg: t.weight_kg,
            weight_cubic: t.weight_cubic,
            goods_value: t.goods_value,
            latitude: None,
            longitude: None,
            customers: None,
        };
        match locations.get(city) {
            Some(places) => stats.extend(places.iter().map(|p| CityStat {
                latitude: Some(p.latitude),
                longitude: Some(p.longitude),
                customers: Some(p.customers),
                ..base.clone()
            })),
            None => stats.push(base),
        }
    }

    info!(rows = stats.len(), "City statistics built");
    stats
}
