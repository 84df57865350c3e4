//! CUBA, the built-in key space of CUDS.
//!
//! Each key is a constant of this module, named after the key; the registry
//! itself is built on first access and shared from then on.
//!
//! ```
//! use cuds_types::cuba;
//!
//! let ks = cuba::keyspace();
//! assert_eq!(ks.lookup("velocity"), Some(cuba::VELOCITY));
//! assert_eq!(ks.get(cuba::VELOCITY).unwrap().shape(), &[3]);
//! ```

use std::sync::{Arc, OnceLock};

use crate::keyspace::ScalarType::{self, Bool, Float64, Int32, Uuid};
use crate::keyspace::{Key, KeySpace};

/// Stored width of text keys without a more specific limit.
pub const DEFAULT_TEXT_LEN: usize = 20;

const TEXT: ScalarType = ScalarType::Text {
    max_len: DEFAULT_TEXT_LEN,
};

macro_rules! define_cuba {
    (@dtype) => { None };
    (@dtype $dtype:ident) => { Some($dtype) };
    ($($name:ident = $ordinal:literal $(: $dtype:ident $([$($dim:literal),+])?)?;)*) => {
        $(pub const $name: Key = Key::new($ordinal);)*

        fn build() -> KeySpace {
            let builder = KeySpace::builder();
            $(let builder = builder.define(
                $ordinal,
                stringify!($name),
                define_cuba!(@dtype $($dtype)?),
                &[$($($($dim),+)?)?],
            );)*
            builder
                .build()
                .expect("built-in CUBA definitions are consistent")
        }
    };
}

define_cuba! {
    UID = 1: Uuid;
    NAME = 2: TEXT;
    STATUS = 3: Int32;
    LABEL = 4: Int32;
    MATERIAL_ID = 5: Int32;
    CHEMICAL_SPECIE = 6: TEXT;
    VERSION = 7: TEXT;
    MATERIAL = 8: Uuid;
    POSITION = 10: Float64[3];
    VELOCITY = 11: Float64[3];
    ACCELERATION = 12: Float64[3];
    FORCE = 13: Float64[3];
    MOMENTUM = 14: Float64[3];
    DIRECTION = 15: Float64[3];
    ORIGIN = 16: Float64[3];
    ANGULAR_VELOCITY = 17: Float64[3];
    DELTA_DISPLACEMENT = 18: Float64[3];
    MASS = 20: Float64;
    RADIUS = 21: Float64;
    CHARGE = 22: Float64;
    DENSITY = 23: Float64;
    TEMPERATURE = 24: Float64;
    PRESSURE = 25: Float64;
    VOLUME = 26: Float64;
    ENERGY = 27: Float64;
    DYNAMIC_VISCOSITY = 28: Float64;
    KINEMATIC_VISCOSITY = 29: Float64;
    FRICTION_COEFFICIENT = 30: Float64;
    ROLLING_FRICTION = 31: Float64;
    YOUNG_MODULUS = 32: Float64;
    POISSON_RATIO = 33: Float64;
    TIME_STEP = 40: Float64;
    NUMBER_OF_TIME_STEPS = 41: Int32;
    FIXED = 42: Bool;
    STRESS_TENSOR = 50: Float64[3, 3];
    STRAIN_TENSOR = 51: Float64[3, 3];
    LATTICE_VECTORS = 52: Float64[3, 3];
    SIZE = 53: Int32[3];
    PERIODIC = 54: Bool[3];
    PHYSICS_EQUATION = 60;
    MATERIAL_RELATION = 61;
    COMPUTATIONAL_METHOD = 62;
}

static REGISTRY: OnceLock<Arc<KeySpace>> = OnceLock::new();

/// The CUBA key space. Built once, immutable afterwards.
pub fn keyspace() -> Arc<KeySpace> {
    Arc::clone(REGISTRY.get_or_init(|| Arc::new(build())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_built_once() {
        assert!(Arc::ptr_eq(&keyspace(), &keyspace()));
    }

    #[test]
    fn constants_match_their_definitions() {
        let ks = keyspace();
        let stress = ks.get(STRESS_TENSOR).unwrap();
        assert_eq!(stress.name(), "STRESS_TENSOR");
        assert_eq!(stress.shape(), &[3, 3]);
        assert_eq!(stress.element_count(), 9);
        assert_eq!(ks.get(NAME).unwrap().dtype(), Some(TEXT));
        assert_eq!(ks.get(PHYSICS_EQUATION).unwrap().dtype(), None);
        assert_eq!(ks.lookup("Mass"), Some(MASS));
    }

    #[test]
    fn keys_iterate_in_ordinal_order() {
        let ks = keyspace();
        let ordinals: Vec<_> = ks.keys().map(Key::ordinal).collect();
        let mut sorted = ordinals.clone();
        sorted.sort_unstable();
        assert_eq!(ordinals, sorted);
        assert_eq!(ks.keys().next(), Some(UID));
    }
}
