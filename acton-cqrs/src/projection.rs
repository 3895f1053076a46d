//! Projections between request, command/query, result and response shapes
//!
//! Every endpoint is bound with two projections: request parameters to the
//! command or query, and handler result to the response body. Prefer
//! [`Projection::convert`] (a `From` impl written per pair) or
//! [`Projection::with`]; both are checked by the compiler.
//!
//! [`Projection::structural`] is the opt-in fallback for shapes that share
//! field names. It round-trips through `serde_json`, so it is probed once at
//! bind time with the source type's `Default` value and rejected there when
//! the shapes cannot line up.
//!
//! ```rust
//! use acton_cqrs::projection::Projection;
//!
//! struct CreateProductRequest { name: String }
//! struct CreateProduct { name: String }
//!
//! impl From<CreateProductRequest> for CreateProduct {
//!     fn from(r: CreateProductRequest) -> Self {
//!         Self { name: r.name }
//!     }
//! }
//!
//! let p = Projection::<CreateProductRequest, CreateProduct>::convert();
//! let command = p.apply(CreateProductRequest { name: "Desk".into() }).unwrap();
//! assert_eq!(command.name, "Desk");
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::failure::Failure;

type MapFn<F, T> = Arc<dyn Fn(F) -> std::result::Result<T, serde_json::Error> + Send + Sync>;

/// How a projection maps its input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    /// Caller-supplied function
    Explicit,
    /// `From`/`Into` conversion
    Conversion,
    /// Field-by-name copy through `serde_json`
    Structural,
}

/// Mapping from `F` to `T`, fixed at bind time
pub struct Projection<F, T> {
    kind: ProjectionKind,
    map: MapFn<F, T>,
    probe: Option<fn() -> std::result::Result<(), serde_json::Error>>,
}

impl<F, T> Clone for Projection<F, T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            map: self.map.clone(),
            probe: self.probe,
        }
    }
}

impl<F, T> fmt::Debug for Projection<F, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection")
            .field("kind", &self.kind)
            .field("from", &type_name::<F>())
            .field("to", &type_name::<T>())
            .finish()
    }
}

impl<F: 'static, T: 'static> Projection<F, T> {
    /// Map with an explicit function
    pub fn with<M>(map: M) -> Self
    where
        M: Fn(F) -> T + Send + Sync + 'static,
    {
        Self {
            kind: ProjectionKind::Explicit,
            map: Arc::new(move |from: F| Ok::<T, serde_json::Error>(map(from))),
            probe: None,
        }
    }

    /// Map through `From`/`Into`
    pub fn convert() -> Self
    where
        F: Into<T>,
    {
        Self {
            kind: ProjectionKind::Conversion,
            map: Arc::new(|from: F| Ok::<T, serde_json::Error>(from.into())),
            probe: None,
        }
    }

    /// Copy fields by name through `serde_json`
    ///
    /// Source fields without a counterpart are dropped; target fields
    /// without a source must be `#[serde(default)]` or `Option`.
    pub fn structural() -> Self
    where
        F: Serialize + Default,
        T: DeserializeOwned,
    {
        Self {
            kind: ProjectionKind::Structural,
            map: Arc::new(|from: F| structural_map::<F, T>(&from)),
            probe: Some(structural_probe::<F, T>),
        }
    }

    /// The mapping strategy
    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }

    /// Check the mapping once, at bind time
    ///
    /// Only structural projections can fail here.
    pub fn verify(&self) -> Result<()> {
        match self.probe {
            Some(probe) => probe().map_err(|err| Error::IncompatibleMapping {
                from: type_name::<F>(),
                to: type_name::<T>(),
                reason: err.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Map a value
    ///
    /// A structural mapping that fails at request time is an internal
    /// failure; the bind-time probe already vouched for the shapes.
    pub fn apply(&self, from: F) -> std::result::Result<T, Failure> {
        (self.map)(from).map_err(|err| {
            Failure::internal(anyhow::Error::new(err).context(format!(
                "structural mapping from {} to {} failed",
                type_name::<F>(),
                type_name::<T>()
            )))
        })
    }
}

fn structural_map<F, T>(from: &F) -> std::result::Result<T, serde_json::Error>
where
    F: Serialize,
    T: DeserializeOwned,
{
    serde_json::to_value(from).and_then(serde_json::from_value)
}

fn structural_probe<F, T>() -> std::result::Result<(), serde_json::Error>
where
    F: Serialize + Default,
    T: DeserializeOwned,
{
    structural_map::<F, T>(&F::default()).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use uuid::Uuid;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct UpdatePriceRequest {
        id: Uuid,
        price: u64,
        note: String,
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct UpdatePrice {
        id: Uuid,
        price: u64,
        note: String,
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct PriceOnly {
        price: u64,
        #[serde(default)]
        currency: String,
    }

    #[derive(Debug, Deserialize)]
    struct NeedsSku {
        #[allow(dead_code)]
        sku: String,
    }

    #[derive(Debug, Deserialize)]
    struct PriceAsText {
        #[allow(dead_code)]
        price: String,
    }

    #[test]
    fn test_structural_matches_field_by_field_copy() {
        let request = UpdatePriceRequest {
            id: Uuid::new_v4(),
            price: 1299,
            note: "spring sale".into(),
        };
        let manual = UpdatePrice {
            id: request.id,
            price: request.price,
            note: request.note.clone(),
        };

        let projection = Projection::<UpdatePriceRequest, UpdatePrice>::structural();
        projection.verify().unwrap();
        assert_eq!(projection.apply(request).unwrap(), manual);
    }

    #[test]
    fn test_structural_drops_extra_and_defaults_missing() {
        let projection = Projection::<UpdatePriceRequest, PriceOnly>::structural();
        projection.verify().unwrap();

        let out = projection
            .apply(UpdatePriceRequest {
                price: 5,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            out,
            PriceOnly {
                price: 5,
                currency: String::new()
            }
        );
    }

    #[test]
    fn test_structural_probe_rejects_missing_field() {
        let projection = Projection::<UpdatePriceRequest, NeedsSku>::structural();
        let err = projection.verify().unwrap_err();
        match err {
            Error::IncompatibleMapping { from, to, reason } => {
                assert!(from.ends_with("UpdatePriceRequest"));
                assert!(to.ends_with("NeedsSku"));
                assert!(reason.contains("sku"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_structural_probe_rejects_type_mismatch() {
        let projection = Projection::<UpdatePriceRequest, PriceAsText>::structural();
        assert!(matches!(
            projection.verify(),
            Err(Error::IncompatibleMapping { .. })
        ));
    }

    #[test]
    fn test_explicit_and_conversion_need_no_probe() {
        let explicit = Projection::<u64, String>::with(|n| format!("#{n}"));
        explicit.verify().unwrap();
        assert_eq!(explicit.kind(), ProjectionKind::Explicit);
        assert_eq!(explicit.apply(7).unwrap(), "#7");

        let conversion = Projection::<u8, u64>::convert();
        assert_eq!(conversion.kind(), ProjectionKind::Conversion);
        assert_eq!(conversion.apply(9).unwrap(), 9u64);
    }
}
