use log::debug;
use serde::Deserialize;
use std::str::FromStr;

pub trait Smoother {
    fn smooth(&self, samples: &[(f64, f64)]) -> Vec<(f64, f64)>;
}

/// leaves the samples untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Smoother for Identity {
    fn smooth(&self, samples: &[(f64, f64)]) -> Vec<(f64, f64)> {
        samples.to_vec()
    }
}

/// Natural cubic spline through the samples, evaluated on every whole day
/// between the first and the last x. Knots are reproduced and calendar gaps
/// are filled.
#[derive(Debug, Clone, Copy, Default)]
pub struct CubicSpline;

impl Smoother for CubicSpline {
    fn smooth(&self, samples: &[(f64, f64)]) -> Vec<(f64, f64)> {
        let spline = match NaturalSpline::new(samples) {
            Some(s) => s,
            None => return samples.to_vec(),
        };
        let x0 = samples[0].0;
        let days = (samples[samples.len() - 1].0 - x0).round() as usize;
        (0..=days)
            .map(|k| {
                let x = x0 + k as f64;
                (x, spline.eval(x))
            })
            .collect()
    }
}

struct NaturalSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    // second derivatives at the knots, zero at both ends
    m: Vec<f64>,
}

impl NaturalSpline {
    /// None with fewer than two knots or when x is not strictly increasing
    fn new(samples: &[(f64, f64)]) -> Option<NaturalSpline> {
        let n = samples.len();
        if n < 2 || samples.windows(2).any(|w| w[1].0 <= w[0].0) {
            return None;
        }
        let x: Vec<f64> = samples.iter().map(|s| s.0).collect();
        let y: Vec<f64> = samples.iter().map(|s| s.1).collect();
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let mut m = vec![0.; n];
        if n > 2 {
            // tridiagonal system for the interior knots, solved with the Thomas algorithm
            let k = n - 2;
            let mut diag = vec![0.; k];
            let mut rhs = vec![0.; k];
            for i in 0..k {
                diag[i] = 2. * (h[i] + h[i + 1]);
                rhs[i] = 6. * ((y[i + 2] - y[i + 1]) / h[i + 1] - (y[i + 1] - y[i]) / h[i]);
            }
            for i in 1..k {
                let f = h[i] / diag[i - 1];
                diag[i] -= f * h[i];
                rhs[i] -= f * rhs[i - 1];
            }
            m[k] = rhs[k - 1] / diag[k - 1];
            for i in (0..k - 1).rev() {
                m[i + 1] = (rhs[i] - h[i + 1] * m[i + 2]) / diag[i];
            }
        }
        Some(NaturalSpline { x, y, m })
    }

    fn eval(&self, t: f64) -> f64 {
        let last = self.x.len() - 2;
        let i = self.x.partition_point(|&xi| xi <= t).saturating_sub(1).min(last);
        let (x0, x1) = (self.x[i], self.x[i + 1]);
        let h = x1 - x0;
        let (a, b) = (x1 - t, t - x0);
        self.m[i] * a.powi(3) / (6. * h)
            + self.m[i + 1] * b.powi(3) / (6. * h)
            + (self.y[i] / h - self.m[i] * h / 6.) * a
            + (self.y[i + 1] / h - self.m[i + 1] * h / 6.) * b
    }
}

/// Weighted centred moving average over y, x untouched.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: Vec<f64>,
    max_missing_v: usize,
    max_missing_wpct: f64,
}

impl MovingAverage {
    /// window of 2 * side + 1 days, flat or rising linearly towards the centre
    pub fn new(side: usize, triangular: bool) -> MovingAverage {
        let window = if triangular {
            make_window(1., side as f64 + 1., side)
        } else {
            make_window(1., 1., side)
        };
        MovingAverage {
            window,
            max_missing_v: side,
            max_missing_wpct: 50.,
        }
    }
}

impl Smoother for MovingAverage {
    fn smooth(&self, samples: &[(f64, f64)]) -> Vec<(f64, f64)> {
        let v: Vec<f64> = samples.iter().map(|s| s.1).collect();
        let smooth = mavg(&v, &self.window, self.max_missing_v, self.max_missing_wpct);
        samples
            .iter()
            .zip(smooth)
            .map(|(&(x, y), s)| if s.is_nan() { (x, y) } else { (x, s) })
            .collect()
    }
}

/// Which smoother to apply, as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Smoothing {
    None,
    Spline,
    MovingAverage {
        side: usize,
        #[serde(default)]
        triangular: bool,
    },
}

impl Default for Smoothing {
    fn default() -> Smoothing {
        Smoothing::None
    }
}

impl Smoothing {
    pub fn smoother(&self) -> Box<dyn Smoother> {
        match *self {
            Smoothing::None => Box::new(Identity),
            Smoothing::Spline => Box::new(CubicSpline),
            Smoothing::MovingAverage { side, triangular } => {
                Box::new(MovingAverage::new(side, triangular))
            }
        }
    }
}

/// cli names: none, spline, mavg (3 days on each side)
impl FromStr for Smoothing {
    type Err = String;

    fn from_str(s: &str) -> Result<Smoothing, String> {
        match s {
            "none" => Ok(Smoothing::None),
            "spline" => Ok(Smoothing::Spline),
            "mavg" => Ok(Smoothing::MovingAverage {
                side: 3,
                triangular: false,
            }),
            other => Err(format!("unknown smoothing {}", other)),
        }
    }
}

/// Weights of a moving window with s elements on each side of the centre,
/// going linearly from a at the ends to b at the centre and summing to 1.
pub fn make_window(a: f64, b: f64, s: usize) -> Vec<f64> {
    let window: Vec<f64> = if a == b {
        vec![1. / (s as f64 * 2. + 1.); s * 2 + 1]
    } else {
        let step = (b - a) / (s as f64);
        let up = (0..=s).map(|i| a + step * i as f64);
        let down = (0..s).rev().map(|i| a + step * i as f64);
        let updown: Vec<f64> = up.chain(down).collect();
        let updown_sum: f64 = updown.iter().sum();
        updown.into_iter().map(|v| v / updown_sum).collect()
    };
    debug_assert!(
        (window.iter().sum::<f64>() - 1.).abs() < 0.02,
        "sum of moving average weights != 1 +- 0.02"
    );
    window
}

/// rolls the weighted moving window w over the data v
/// fills the NAN values with the weighted average when possible:
/// 1) sufficient number of data, i.e.,
///     number missing data under the window <= max_missing_v
/// 2) the window weight associated with the present data is sufficient, i.e.,
///     the percentage of missing weight is < than max_missing_wpct
/// a window as long as the data, or with an even length, leaves the data unchanged
pub fn mavg(v: &[f64], w: &[f64], max_missing_v: usize, max_missing_wpct: f64) -> Vec<f64> {
    let len_v: i64 = v.len() as i64;
    let len_w: i64 = w.len() as i64;
    if len_w >= len_v || len_w % 2 != 1 {
        return v.to_vec();
    }
    let side: i64 = (len_w - 1) / 2;
    let sum_all_w: f64 = w.iter().sum();
    let max_missing_w: f64 = sum_all_w / 100. * max_missing_wpct;
    let mut vout: Vec<f64> = Vec::with_capacity(len_v as usize);
    for i in 0..len_v {
        let mut missing_v = 0;
        let mut missing_w = 0.;
        let mut sum_ve_we = 0.;
        let mut sum_we = 0.;
        let vl = i - side;
        let vr = i + side + 1;
        for (j, we) in (vl..vr).zip(w.iter()) {
            if (j < 0) || (j >= len_v) || v[j as usize].is_nan() {
                missing_v += 1;
                missing_w += we;
            } else {
                sum_ve_we += v[j as usize] * we;
                sum_we += we;
            }
            if (missing_v > max_missing_v) || (missing_w > max_missing_w) {
                sum_ve_we = f64::NAN;
                debug!(
                    "setting to NAN; {} missing data with limit {}, {} missing window weight with limit {}",
                    missing_v, max_missing_v, missing_w, max_missing_w,
                );
                break;
            }
        }
        vout.push(sum_ve_we / sum_we);
    }
    vout
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn spline_reproduces_knots() {
        let samples = vec![(0., 10.), (1., 20.), (2., 250.), (3., 260.), (4., 400.)];
        let out = CubicSpline.smooth(&samples);
        assert_eq!(out.len(), samples.len());
        for (s, o) in samples.iter().zip(out.iter()) {
            assert!(close(s.0, o.0));
            assert!(close(s.1, o.1), "{} != {}", s.1, o.1);
        }
    }

    #[test]
    fn spline_fills_calendar_gaps() {
        // collinear knots give a straight spline
        let samples = vec![(0., 0.), (1., 10.), (4., 40.), (5., 50.)];
        let out = CubicSpline.smooth(&samples);
        let xs: Vec<f64> = out.iter().map(|p| p.0).collect();
        assert_eq!(xs, vec![0., 1., 2., 3., 4., 5.]);
        assert!(close(out[2].1, 20.));
        assert!(close(out[3].1, 30.));
    }

    #[test]
    fn spline_with_two_knots_is_linear() {
        let out = CubicSpline.smooth(&[(0., 0.), (2., 4.)]);
        assert_eq!(out.len(), 3);
        assert!(close(out[1].1, 2.));
        assert_eq!(CubicSpline.smooth(&[(0., 7.)]), vec![(0., 7.)]);
    }

    #[test]
    fn window_weights_sum_to_one() {
        let flat = make_window(1., 1., 2);
        assert_eq!(flat.len(), 5);
        assert!(close(flat.iter().sum::<f64>(), 1.));
        let tri = make_window(1., 3., 2);
        assert_eq!(tri.len(), 5);
        assert!(close(tri[0], 1. / 9.));
        assert!(close(tri[2], 3. / 9.));
        assert!(close(tri.iter().sum::<f64>(), 1.));
    }

    #[test]
    fn moving_average_flattens_a_spike_and_keeps_x() {
        let samples: Vec<(f64, f64)> = vec![0., 0., 9., 0., 0.]
            .into_iter()
            .enumerate()
            .map(|(i, y)| (i as f64, y))
            .collect();
        let out = MovingAverage::new(1, false).smooth(&samples);
        assert!(close(out[2].1, 3.));
        assert!(close(out[1].1, 3.));
        assert!(close(out[0].1, 0.));
        assert_eq!(out.iter().map(|p| p.0).collect::<Vec<_>>(), vec![0., 1., 2., 3., 4.]);
    }

    #[test]
    fn moving_average_needs_a_shorter_window() {
        let samples = vec![(0., 1.), (1., 5.)];
        assert_eq!(MovingAverage::new(1, false).smooth(&samples), samples);
    }

    #[test]
    fn smoothing_from_yaml_and_cli() {
        let s: Smoothing = serde_yaml::from_str("method: moving_average\nside: 2\n").unwrap();
        assert_eq!(
            s,
            Smoothing::MovingAverage {
                side: 2,
                triangular: false
            }
        );
        assert_eq!("spline".parse::<Smoothing>().unwrap(), Smoothing::Spline);
        assert!("loess".parse::<Smoothing>().is_err());
    }
}
