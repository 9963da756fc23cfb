//! Progress events and their delivery.

use std::sync::mpsc::Sender;

use ndarray::Array1;
use serde::Serialize;

use crate::biquad::DeflatedBiquad;
use crate::cost::PeakingCost;

/// Relative tolerance under which two successive costs count as unchanged.
pub const COST_CHANGE_TOLERANCE: f64 = 1e-12;

/// `true` if `a` and `b` agree to within [`COST_CHANGE_TOLERANCE`].
pub fn approx_equal(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    (a - b).abs() <= COST_CHANGE_TOLERANCE * a.abs().max(b.abs())
}

/// Receives progress of a single fit. Every method defaults to a no-op.
pub trait FitObserver {
    /// Best cost after an optimizer iteration.
    fn on_cost(&mut self, _cost: f64) {}
    /// Combined response of the current best, on the working grid.
    fn on_curve(&mut self, _response: &Array1<f64>) {}
    /// Final bands, once per run.
    fn on_complete(&mut self, _bands: &[DeflatedBiquad]) {}
}

/// Observer that ignores everything.
impl FitObserver for () {}

/// An owned progress event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FitEvent {
    /// Best cost after an iteration
    Cost(f64),
    /// Combined response of the current best
    Curve(Vec<f64>),
    /// Final bands
    Completed(Vec<DeflatedBiquad>),
}

/// Records every event in order.
impl FitObserver for Vec<FitEvent> {
    fn on_cost(&mut self, cost: f64) {
        self.push(FitEvent::Cost(cost));
    }
    fn on_curve(&mut self, response: &Array1<f64>) {
        self.push(FitEvent::Curve(response.to_vec()));
    }
    fn on_complete(&mut self, bands: &[DeflatedBiquad]) {
        self.push(FitEvent::Completed(bands.to_vec()));
    }
}

/// Forwards events over a channel, fire-and-forget.
///
/// A disconnected receiver is not an error: events are dropped.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: Sender<FitEvent>,
}

impl ChannelObserver {
    /// Wraps the sending half of a channel.
    pub fn new(sender: Sender<FitEvent>) -> Self {
        Self { sender }
    }

    fn send(&self, event: FitEvent) {
        let _ = self.sender.send(event);
    }
}

impl FitObserver for ChannelObserver {
    fn on_cost(&mut self, cost: f64) {
        self.send(FitEvent::Cost(cost));
    }
    fn on_curve(&mut self, response: &Array1<f64>) {
        self.send(FitEvent::Curve(response.to_vec()));
    }
    fn on_complete(&mut self, bands: &[DeflatedBiquad]) {
        self.send(FitEvent::Completed(bands.to_vec()));
    }
}

/// Turns optimizer iterations into observer events.
///
/// Cost events are always sent. The response curve is recomputed and sent
/// only when the cost moved since the previous iteration, or on the first.
pub struct ProgressReporter<'a> {
    cost: &'a PeakingCost,
    observer: &'a mut dyn FitObserver,
    last_cost: Option<f64>,
}

impl<'a> ProgressReporter<'a> {
    /// Reporter for a run scored by `cost`.
    pub fn new(cost: &'a PeakingCost, observer: &'a mut dyn FitObserver) -> Self {
        Self {
            cost,
            observer,
            last_cost: None,
        }
    }

    /// Handles one iteration's best vector and cost.
    pub fn iteration(&mut self, x: &Array1<f64>, cost: f64) {
        self.observer.on_cost(cost);
        let changed = self.last_cost.is_none_or(|last| !approx_equal(last, cost));
        if changed {
            self.observer.on_curve(&self.cost.response(x));
        }
        self.last_cost = Some(cost);
    }

    /// Converts the final vector to bands and sends the completion event.
    pub fn finish(&mut self, x: &Array1<f64>) -> Vec<DeflatedBiquad> {
        let bands = self.cost.to_bands(x);
        self.observer.on_complete(&bands);
        bands
    }
}
