//! Time-indexed result lists.
//!
//! A list keeps one array per fitted quantity plus a `times` array. All arrays
//! are private and grow together, so they always have the same length; lists
//! built from existing arrays (or deserialized) are checked on construction.

use serde::{Deserialize, Serialize};

use crate::domain::{Err2, FitKind, FitRecord, MLFit, MLGaussianFit};
use crate::error::{FitError, FitResult};

/// Common interface of the result lists, used by the time-series orchestrator.
pub trait FitList: Default {
    /// Name of the record kind this list accepts.
    const RECORD_KIND: &'static str;

    /// Append one record and its timestamp.
    ///
    /// Fails with `TypeMismatch` (leaving the list untouched) when `record`
    /// is of the other kind.
    fn append(&mut self, record: FitRecord, time: f64) -> FitResult<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn times(&self) -> &[f64];
}

fn check_lengths(context: &'static str, lengths: &[usize]) -> FitResult<()> {
    if lengths.windows(2).all(|w| w[0] == w[1]) {
        Ok(())
    } else {
        Err(FitError::InconsistentLengths {
            context,
            lengths: lengths.to_vec(),
        })
    }
}

/// Uniform fits over time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MLFitListData")]
pub struct MLFitList {
    mu: Vec<f64>,
    sigma2: Vec<f64>,
    #[serde(with = "json_float")]
    ln_lh: Vec<f64>,
    err2: Vec<Err2>,
    times: Vec<f64>,
}

#[derive(Deserialize)]
struct MLFitListData {
    mu: Vec<f64>,
    sigma2: Vec<f64>,
    #[serde(with = "json_float")]
    ln_lh: Vec<f64>,
    err2: Vec<Err2>,
    times: Vec<f64>,
}

impl TryFrom<MLFitListData> for MLFitList {
    type Error = FitError;

    fn try_from(d: MLFitListData) -> Result<Self, Self::Error> {
        MLFitList::from_parts(d.mu, d.sigma2, d.ln_lh, d.err2, d.times)
    }
}

impl MLFitList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from existing, equally long arrays.
    pub fn from_parts(
        mu: Vec<f64>,
        sigma2: Vec<f64>,
        ln_lh: Vec<f64>,
        err2: Vec<Err2>,
        times: Vec<f64>,
    ) -> FitResult<Self> {
        check_lengths(
            "MLFitList",
            &[mu.len(), sigma2.len(), ln_lh.len(), err2.len(), times.len()],
        )?;
        Ok(Self {
            mu,
            sigma2,
            ln_lh,
            err2,
            times,
        })
    }

    pub fn push(&mut self, fit: MLFit, time: f64) {
        self.mu.push(fit.mu);
        self.sigma2.push(fit.sigma2);
        self.ln_lh.push(fit.ln_lh);
        self.err2.push(fit.err2);
        self.times.push(time);
    }

    /// Record at `index` and its timestamp.
    pub fn get(&self, index: usize) -> Option<(MLFit, f64)> {
        if index >= self.len() {
            return None;
        }
        let fit = MLFit {
            mu: self.mu[index],
            sigma2: self.sigma2[index],
            ln_lh: self.ln_lh[index],
            err2: self.err2[index].clone(),
        };
        Some((fit, self.times[index]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (MLFit, f64)> + '_ {
        (0..self.len()).filter_map(move |k| self.get(k))
    }

    pub fn len(&self) -> usize {
        self.mu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mu.is_empty()
    }

    pub fn mu(&self) -> &[f64] {
        &self.mu
    }

    pub fn sigma2(&self) -> &[f64] {
        &self.sigma2
    }

    pub fn ln_lh(&self) -> &[f64] {
        &self.ln_lh
    }

    pub fn err2(&self) -> &[Err2] {
        &self.err2
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }
}

impl FitList for MLFitList {
    const RECORD_KIND: &'static str = "MLFit";

    fn append(&mut self, record: FitRecord, time: f64) -> FitResult<()> {
        match record {
            FitRecord::Uniform(fit) => {
                self.push(fit, time);
                Ok(())
            }
            other => Err(FitError::TypeMismatch {
                expected: Self::RECORD_KIND,
                found: other.kind_name(),
            }),
        }
    }

    fn len(&self) -> usize {
        MLFitList::len(self)
    }

    fn times(&self) -> &[f64] {
        &self.times
    }
}

/// Circular Gaussian fits over time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MLGaussianFitListData")]
pub struct MLGaussianFitList {
    amplitude: Vec<f64>,
    mu_x: Vec<f64>,
    mu_y: Vec<f64>,
    sigma: Vec<f64>,
    err2: Vec<Err2>,
    #[serde(with = "json_float")]
    ln_lh: Vec<f64>,
    #[serde(with = "json_float")]
    lh_precision: Vec<f64>,
    times: Vec<f64>,
}

#[derive(Deserialize)]
struct MLGaussianFitListData {
    amplitude: Vec<f64>,
    mu_x: Vec<f64>,
    mu_y: Vec<f64>,
    sigma: Vec<f64>,
    err2: Vec<Err2>,
    #[serde(with = "json_float")]
    ln_lh: Vec<f64>,
    #[serde(with = "json_float")]
    lh_precision: Vec<f64>,
    times: Vec<f64>,
}

impl TryFrom<MLGaussianFitListData> for MLGaussianFitList {
    type Error = FitError;

    fn try_from(d: MLGaussianFitListData) -> Result<Self, Self::Error> {
        MLGaussianFitList::from_parts(
            d.amplitude,
            d.mu_x,
            d.mu_y,
            d.sigma,
            d.err2,
            d.ln_lh,
            d.lh_precision,
            d.times,
        )
    }
}

impl MLGaussianFitList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from existing, equally long arrays.
    pub fn from_parts(
        amplitude: Vec<f64>,
        mu_x: Vec<f64>,
        mu_y: Vec<f64>,
        sigma: Vec<f64>,
        err2: Vec<Err2>,
        ln_lh: Vec<f64>,
        lh_precision: Vec<f64>,
        times: Vec<f64>,
    ) -> FitResult<Self> {
        check_lengths(
            "MLGaussianFitList",
            &[
                amplitude.len(),
                mu_x.len(),
                mu_y.len(),
                sigma.len(),
                err2.len(),
                ln_lh.len(),
                lh_precision.len(),
                times.len(),
            ],
        )?;
        Ok(Self {
            amplitude,
            mu_x,
            mu_y,
            sigma,
            err2,
            ln_lh,
            lh_precision,
            times,
        })
    }

    pub fn push(&mut self, fit: MLGaussianFit, time: f64) {
        self.amplitude.push(fit.amplitude);
        self.mu_x.push(fit.mu_x);
        self.mu_y.push(fit.mu_y);
        self.sigma.push(fit.sigma);
        self.err2.push(fit.err2);
        self.ln_lh.push(fit.ln_lh);
        self.lh_precision.push(fit.lh_precision);
        self.times.push(time);
    }

    /// Record at `index` and its timestamp.
    pub fn get(&self, index: usize) -> Option<(MLGaussianFit, f64)> {
        if index >= self.len() {
            return None;
        }
        let fit = MLGaussianFit {
            amplitude: self.amplitude[index],
            mu_x: self.mu_x[index],
            mu_y: self.mu_y[index],
            sigma: self.sigma[index],
            err2: self.err2[index].clone(),
            ln_lh: self.ln_lh[index],
            lh_precision: self.lh_precision[index],
        };
        Some((fit, self.times[index]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (MLGaussianFit, f64)> + '_ {
        (0..self.len()).filter_map(move |k| self.get(k))
    }

    pub fn len(&self) -> usize {
        self.amplitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitude.is_empty()
    }

    pub fn amplitude(&self) -> &[f64] {
        &self.amplitude
    }

    pub fn mu_x(&self) -> &[f64] {
        &self.mu_x
    }

    pub fn mu_y(&self) -> &[f64] {
        &self.mu_y
    }

    pub fn sigma(&self) -> &[f64] {
        &self.sigma
    }

    pub fn err2(&self) -> &[Err2] {
        &self.err2
    }

    pub fn ln_lh(&self) -> &[f64] {
        &self.ln_lh
    }

    pub fn lh_precision(&self) -> &[f64] {
        &self.lh_precision
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }
}

impl FitList for MLGaussianFitList {
    const RECORD_KIND: &'static str = "MLGaussianFit";

    fn append(&mut self, record: FitRecord, time: f64) -> FitResult<()> {
        match record {
            FitRecord::Gaussian(fit) => {
                self.push(fit, time);
                Ok(())
            }
            other => Err(FitError::TypeMismatch {
                expected: Self::RECORD_KIND,
                found: other.kind_name(),
            }),
        }
    }

    fn len(&self) -> usize {
        MLGaussianFitList::len(self)
    }

    fn times(&self) -> &[f64] {
        &self.times
    }
}

/// The result of a tracking run, of either fit kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fits", rename_all = "lowercase")]
pub enum FitTrack {
    Gaussian(MLGaussianFitList),
    Uniform(MLFitList),
}

impl FitTrack {
    pub fn kind(&self) -> FitKind {
        match self {
            FitTrack::Gaussian(_) => FitKind::Gaussian,
            FitTrack::Uniform(_) => FitKind::Uniform,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FitTrack::Gaussian(list) => list.len(),
            FitTrack::Uniform(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn times(&self) -> &[f64] {
        match self {
            FitTrack::Gaussian(list) => list.times(),
            FitTrack::Uniform(list) => list.times(),
        }
    }

    pub fn ln_lh(&self) -> &[f64] {
        match self {
            FitTrack::Gaussian(list) => list.ln_lh(),
            FitTrack::Uniform(list) => list.ln_lh(),
        }
    }
}

impl From<MLGaussianFitList> for FitTrack {
    fn from(value: MLGaussianFitList) -> Self {
        FitTrack::Gaussian(value)
    }
}

impl From<MLFitList> for FitTrack {
    fn from(value: MLFitList) -> Self {
        FitTrack::Uniform(value)
    }
}

/// JSON has no infinities; write non-finite values as strings.
mod json_float {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let out: Vec<Repr> = values
            .iter()
            .map(|&v| {
                if v.is_finite() {
                    Repr::Number(v)
                } else if v.is_nan() {
                    Repr::Text("nan".into())
                } else if v > 0.0 {
                    Repr::Text("inf".into())
                } else {
                    Repr::Text("-inf".into())
                }
            })
            .collect();
        out.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let raw = Vec::<Repr>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|r| match r {
                Repr::Number(v) => Ok(v),
                Repr::Text(s) => match s.as_str() {
                    "inf" => Ok(f64::INFINITY),
                    "-inf" => Ok(f64::NEG_INFINITY),
                    "nan" => Ok(f64::NAN),
                    other => Err(D::Error::custom(format!("invalid float '{other}'"))),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian(k: usize) -> MLGaussianFit {
        let k = k as f64;
        MLGaussianFit {
            amplitude: 10.0 + k,
            mu_x: 1.0 + k,
            mu_y: 2.0 + k,
            sigma: 3.0 + k,
            err2: Err2::PerCell(vec![k, 2.0 * k]),
            ln_lh: -100.0 - k,
            lh_precision: 0.5 + k,
        }
    }

    fn uniform(k: usize) -> MLFit {
        let k = k as f64;
        MLFit {
            mu: k,
            sigma2: 2.0 * k,
            ln_lh: -k,
            err2: Err2::Total(k),
        }
    }

    #[test]
    fn from_parts_accepts_equal_lengths() {
        let list = MLFitList::from_parts(
            vec![1.0, 2.0],
            vec![0.1, 0.2],
            vec![-1.0, -2.0],
            vec![Err2::Total(0.0), Err2::Total(1.0)],
            vec![10.0, 20.0],
        )
        .unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(1).unwrap().1, 20.0);
    }

    #[test]
    fn from_parts_rejects_mismatched_lengths() {
        let err = MLFitList::from_parts(vec![1.0], vec![], vec![1.0], vec![Err2::Total(0.0)], vec![0.0])
            .unwrap_err();
        assert!(matches!(err, FitError::InconsistentLengths { context: "MLFitList", .. }));

        let err = MLGaussianFitList::from_parts(
            vec![1.0],
            vec![1.0],
            vec![1.0],
            vec![1.0],
            vec![Err2::Total(0.0)],
            vec![1.0],
            vec![1.0],
            vec![0.0, 1.0],
        )
        .unwrap_err();
        assert_eq!(
            err,
            FitError::InconsistentLengths {
                context: "MLGaussianFitList",
                lengths: vec![1, 1, 1, 1, 1, 1, 1, 2],
            }
        );
    }

    #[test]
    fn appends_stay_aligned_and_index_back() {
        let mut list = MLGaussianFitList::new();
        for k in 0..5 {
            list.append(FitRecord::Gaussian(gaussian(k)), k as f64 * 0.25).unwrap();
        }
        assert_eq!(list.len(), 5);
        for arr in [
            list.amplitude(),
            list.mu_x(),
            list.mu_y(),
            list.sigma(),
            list.ln_lh(),
            list.lh_precision(),
            list.times(),
        ] {
            assert_eq!(arr.len(), 5);
        }
        assert_eq!(list.err2().len(), 5);

        let (fit, t) = list.get(3).unwrap();
        assert_eq!(fit, gaussian(3));
        assert_eq!(t, 0.75);
        assert!(list.get(5).is_none());
        assert_eq!(list.iter().count(), 5);
    }

    #[test]
    fn wrong_record_kind_is_rejected_without_mutation() {
        let mut list = MLFitList::new();
        list.push(uniform(1), 1.0);

        let err = list.append(FitRecord::Gaussian(gaussian(0)), 2.0).unwrap_err();
        assert_eq!(
            err,
            FitError::TypeMismatch {
                expected: "MLFit",
                found: "MLGaussianFit",
            }
        );
        assert_eq!(list.len(), 1);
        assert_eq!(list.times(), &[1.0]);

        let mut glist = MLGaussianFitList::new();
        assert!(glist.append(FitRecord::Uniform(uniform(0)), 0.0).is_err());
        assert!(glist.is_empty());
    }

    #[test]
    fn uniform_list_indexes_single_values() {
        let mut list = MLFitList::new();
        for k in 0..3 {
            list.append(uniform(k).into(), 10.0 * k as f64).unwrap();
        }
        let (fit, t) = list.get(2).unwrap();
        assert_eq!(fit, uniform(2));
        assert_eq!(t, 20.0);
        assert_eq!(FitList::len(&list), 3);
    }

    #[test]
    fn json_keeps_infinities_and_revalidates() {
        let mut list = MLFitList::new();
        list.push(
            MLFit {
                mu: 1.0,
                sigma2: 0.0,
                ln_lh: f64::INFINITY,
                err2: Err2::PerCell(vec![0.0, 0.0]),
            },
            0.5,
        );
        let json = serde_json::to_string(&list).unwrap();
        assert!(json.contains("\"inf\""));
        let back: MLFitList = serde_json::from_str(&json).unwrap();
        assert_eq!(back, list);

        let broken = r#"{"mu":[1.0],"sigma2":[],"ln_lh":[1.0],"err2":[0.0],"times":[0.0]}"#;
        assert!(serde_json::from_str::<MLFitList>(broken).is_err());
    }
}
