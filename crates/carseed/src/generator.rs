//! 🎲 The generator: a dealership with infinite inventory and zero quality control.
//!
//! Every call to [`CarGenerator::next_car`] picks a make, a model and a location from
//! fixed pools, then rolls a year and a price. Make and model are drawn independently,
//! so yes, you will occasionally see a Honda Mustang. The receiver has made peace with it.
//!
//! Seed it through config when you want the same lot twice (tests, demos, bug reports
//! that begin with "it only happens with car #4812").

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::app_config::SourceConfig;
use crate::common::Car;

pub(crate) const MAKES: &[&str] = &[
    "Toyota",
    "Honda",
    "Ford",
    "Chevrolet",
    "Nissan",
    "BMW",
    "Mercedes-Benz",
    "Volkswagen",
    "Hyundai",
    "Kia",
    "Subaru",
    "Mazda",
];

pub(crate) const MODELS: &[&str] = &[
    "Corolla",
    "Camry",
    "Civic",
    "Accord",
    "F-150",
    "Mustang",
    "Silverado",
    "Malibu",
    "Altima",
    "Rogue",
    "3 Series",
    "C-Class",
    "Golf",
    "Jetta",
    "Elantra",
    "Sorento",
    "Outback",
    "CX-5",
];

pub(crate) const LOCATIONS: &[&str] = &[
    "New York",
    "Los Angeles",
    "Chicago",
    "Houston",
    "Phoenix",
    "Philadelphia",
    "San Antonio",
    "San Diego",
    "Dallas",
    "Denver",
    "Seattle",
    "Miami",
];

// -- 📅 inclusive on both ends, same as the lot's paperwork
pub(crate) const YEAR_RANGE: std::ops::RangeInclusive<u16> = 2000..=2024;
pub(crate) const PRICE_RANGE: std::ops::RangeInclusive<u32> = 3000..=80000;

/// 🏭 Rolls random cars out of fixed value pools.
#[derive(Debug)]
pub struct CarGenerator {
    rng: StdRng,
}

impl CarGenerator {
    /// 🔧 Seeded when the config says so, otherwise fresh entropy from the OS.
    pub fn from_config(config: &SourceConfig) -> Self {
        match config.seed {
            Some(seed) => Self::seeded(seed),
            None => Self {
                rng: StdRng::from_os_rng(),
            },
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// 🚗 One more car for the pile.
    pub fn next_car(&mut self) -> Car {
        let normalized_make = pick(&mut self.rng, MAKES);
        let normalized_model = pick(&mut self.rng, MODELS);
        let year = self.rng.random_range(YEAR_RANGE);
        let price = self.rng.random_range(PRICE_RANGE);
        let location = pick(&mut self.rng, LOCATIONS);

        Car {
            normalized_make,
            normalized_model,
            year,
            price,
            location,
        }
    }
}

// -- 🎯 pools are non-empty consts, so `choose` only returns None in a universe we don't ship to
fn pick(rng: &mut StdRng, pool: &[&str]) -> String {
    pool.choose(rng).copied().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_same_seed_means_same_lot() {
        let mut first = CarGenerator::seeded(42);
        let mut second = CarGenerator::seeded(42);

        for _ in 0..25 {
            assert_eq!(first.next_car(), second.next_car());
        }
    }

    #[test]
    fn the_one_where_every_car_stays_inside_the_pools() {
        let mut generator = CarGenerator::seeded(7);

        for _ in 0..500 {
            let car = generator.next_car();
            assert!(MAKES.contains(&car.normalized_make.as_str()));
            assert!(MODELS.contains(&car.normalized_model.as_str()));
            assert!(LOCATIONS.contains(&car.location.as_str()));
            assert!(YEAR_RANGE.contains(&car.year), "year {} off the lot", car.year);
            assert!(PRICE_RANGE.contains(&car.price), "price {} is a typo", car.price);
        }
    }

    #[test]
    fn the_one_where_unseeded_config_still_builds_cars() {
        let config = SourceConfig {
            generation_interval_ms: 30,
            seed: None,
        };
        let car = CarGenerator::from_config(&config).next_car();
        assert!(!car.normalized_make.is_empty());
    }
}
