//! The Constant Provider
//!
//! The predefined constants `pi` and `e`, and the values derived from `pi`, are computed to the
//! current working precision by a background worker thread.  A computation is requested
//! whenever the precision changes, and a request for the precision already in effect does
//! nothing, so each precision is computed once.
//!
//! A single permit guards the cache.  A request takes the permit before it queues work for the
//! worker, and the worker gives it back once the new values are in the cache.  A reader takes
//! and returns the permit before it looks, so it waits out any computation in progress and
//! never sees values left over from an earlier precision.
//!
//! Values are cached at two digits beyond the requested precision and rounded on the way out.
//! When the "rational" preference is set, the rounded value is returned as an exact fraction,
//! converted afresh on each read.  Precisions are clamped to
//! [`MAX_PRECISION`](../settings/constant.MAX_PRECISION.html).
//!
//! If the worker dies in the middle of a computation the permit is still given back, and every
//! read from then on fails with `ConstantsUnavailable` rather than waiting for it.

use crate::number::{pow10, Decimal};
use crate::settings::MAX_PRECISION;
use crate::types::{ErrorKind, ReckonResult};
use crate::value::Value;
use num_bigint::BigInt;
use num_traits::Zero;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Extra digits computed beyond the requested precision.
const GUARD_DIGITS: u32 = 2;

/// A one-permit semaphore.
#[derive(Debug)]
pub struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl Gate {
    pub fn new() -> Self {
        Self {
            open: Mutex::new(true),
            cond: Condvar::new(),
        }
    }

    /// Takes the permit, waiting until it is free.
    pub fn acquire(&self) {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        while !*open {
            open = self.cond.wait(open).unwrap_or_else(PoisonError::into_inner);
        }
        *open = false;
    }

    /// Gives the permit back.
    pub fn release(&self) {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        *open = true;
        self.cond.notify_all();
    }

    /// Waits until the permit is free, without keeping it.
    pub fn pass(&self) {
        self.acquire();
        self.release();
    }
}

/// One set of computed constants.
#[derive(Debug, Clone)]
struct Computed {
    precision: u32,
    pi: Decimal,
    e: Decimal,
    half_pi: Decimal,
    pi_over_180: Decimal,
    pi_over_200: Decimal,
}

impl Computed {
    fn new(precision: u32) -> Self {
        let digits = precision.saturating_add(GUARD_DIGITS);
        let pi = compute_pi(digits);

        Self {
            precision,
            e: compute_e(digits),
            half_pi: pi.half(),
            pi_over_180: pi.div_small(180, digits),
            pi_over_200: pi.div_small(200, digits),
            pi,
        }
    }
}

/// State shared with the worker thread.
#[derive(Debug, Default)]
struct Shared {
    gate: Gate,
    cache: Mutex<Option<Computed>>,
    computations: AtomicUsize,
    failed: AtomicBool,
}

impl Shared {
    fn cache(&self) -> MutexGuard<'_, Option<Computed>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Gives the permit back when a computation ends, and marks the provider failed if it ended
/// by panicking.
struct Computing<'a>(&'a Shared);

impl Drop for Computing<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.failed.store(true, Ordering::SeqCst);
        }
        self.0.gate.release();
    }
}

/// Clamps a precision to the supported range.
fn clamp(precision: u32) -> u32 {
    precision.clamp(1, MAX_PRECISION)
}

/// Computes `pi` and `e` in the background at the working precision.
#[derive(Debug)]
pub struct ConstantProvider {
    shared: Arc<Shared>,
    requested: Mutex<Option<u32>>,
    sender: Option<Sender<u32>>,
    worker: Option<JoinHandle<()>>,
}

impl ConstantProvider {
    /// Starts the worker and requests the given precision.
    pub fn new(precision: u32) -> Self {
        let shared = Arc::new(Shared::default());
        let (sender, receiver) = mpsc::channel::<u32>();

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("reckon-constants".into())
            .spawn(move || {
                for precision in receiver {
                    debug!(precision, "computing constants");
                    let started = Instant::now();
                    let computing = Computing(&worker_shared);
                    let computed = Computed::new(precision);
                    *worker_shared.cache() = Some(computed);
                    worker_shared.computations.fetch_add(1, Ordering::SeqCst);
                    drop(computing);
                    trace!(precision, elapsed = ?started.elapsed(), "constants ready");
                }
            });

        let (sender, worker) = match worker {
            Ok(handle) => (Some(sender), Some(handle)),
            Err(err) => {
                warn!(%err, "cannot start the constants worker; computing in place");
                (None, None)
            }
        };

        let provider = Self {
            shared,
            requested: Mutex::new(None),
            sender,
            worker,
        };
        provider.request(precision);
        provider
    }

    /// Requests the constants at a new precision.  Returns false if that precision is already
    /// in effect, or the worker has failed, in which case nothing is computed.
    pub fn request(&self, precision: u32) -> bool {
        let precision = clamp(precision);
        let mut requested = self.requested.lock().unwrap_or_else(PoisonError::into_inner);
        if *requested == Some(precision) || self.shared.failed() {
            return false;
        }

        self.shared.gate.acquire();
        *requested = Some(precision);

        let queued = match &self.sender {
            Some(sender) => sender.send(precision).is_ok(),
            None => false,
        };

        if !queued {
            // No worker: do the work here.
            let computing = Computing(&self.shared);
            *self.shared.cache() = Some(Computed::new(precision));
            self.shared.computations.fetch_add(1, Ordering::SeqCst);
            drop(computing);
        }
        true
    }

    /// The number of computations performed so far.
    pub fn computations(&self) -> usize {
        self.shared.computations.load(Ordering::SeqCst)
    }

    /// The precision of the cached values, once the current computation is done.
    pub fn precision(&self) -> Option<u32> {
        self.shared.gate.pass();
        self.shared.cache().as_ref().map(|c| c.precision)
    }

    /// Reads one constant at the given precision.  The cached values are checked under the
    /// cache lock; if another request replaced them with a different precision in the
    /// meantime, the read requests its own precision again.
    fn read(
        &self,
        precision: u32,
        rational: bool,
        pick: fn(&Computed) -> &Decimal,
    ) -> ReckonResult {
        let precision = clamp(precision);

        loop {
            self.request(precision);
            self.shared.gate.pass();
            if self.shared.failed() {
                return Err(ErrorKind::ConstantsUnavailable.into());
            }

            let cache = self.shared.cache();
            match cache.as_ref() {
                Some(computed) if computed.precision == precision => {
                    let value = pick(computed).round(precision);
                    return Ok(if rational {
                        Value::from(value.to_fraction())
                    } else {
                        Value::from(value)
                    });
                }
                _ => {}
            }
            drop(cache);

            trace!(precision, "cached constants are at another precision; requesting again");
            let mut requested = self.requested.lock().unwrap_or_else(PoisonError::into_inner);
            if *requested == Some(precision) {
                *requested = None;
            }
        }
    }

    /// Pi.
    pub fn pi(&self, precision: u32, rational: bool) -> ReckonResult {
        self.read(precision, rational, |c| &c.pi)
    }

    /// Euler's number.
    pub fn e(&self, precision: u32, rational: bool) -> ReckonResult {
        self.read(precision, rational, |c| &c.e)
    }

    /// Pi over two.
    pub fn half_pi(&self, precision: u32, rational: bool) -> ReckonResult {
        self.read(precision, rational, |c| &c.half_pi)
    }

    /// Pi over 180: radians per degree.
    pub fn pi_over_180(&self, precision: u32, rational: bool) -> ReckonResult {
        self.read(precision, rational, |c| &c.pi_over_180)
    }

    /// Pi over 200: radians per gradian.
    pub fn pi_over_200(&self, precision: u32, rational: bool) -> ReckonResult {
        self.read(precision, rational, |c| &c.pi_over_200)
    }
}

impl Drop for ConstantProvider {
    fn drop(&mut self) {
        // Closing the channel ends the worker's loop.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("constants worker panicked");
            }
        }
    }
}

//------------------------------------------------------------------------------------------------
// Series

/// `arctan(1/x)` scaled by `unity`.
fn arctan_inv(x: u32, unity: &BigInt) -> BigInt {
    let x = BigInt::from(x);
    let x2 = &x * &x;

    let mut power = unity / &x;
    let mut sum = power.clone();
    let mut n: u32 = 1;

    loop {
        power /= &x2;
        let term = &power / (2 * n + 1);
        if term.is_zero() {
            break;
        }
        if n % 2 == 1 {
            sum -= term;
        } else {
            sum += term;
        }
        n += 1;
    }
    sum
}

/// Pi to the given number of significant digits, by Machin's formula.
fn compute_pi(digits: u32) -> Decimal {
    let work = digits + 10;
    let unity = pow10(work);
    let pi = (arctan_inv(5, &unity) * 4 - arctan_inv(239, &unity)) * 4;
    Decimal::new(pi, work as i64).truncate(digits)
}

/// Euler's number to the given number of significant digits, by its factorial series.
fn compute_e(digits: u32) -> Decimal {
    let work = digits + 10;
    let mut term = pow10(work);
    let mut sum = BigInt::zero();
    let mut k: u32 = 0;

    while !term.is_zero() {
        sum += &term;
        k += 1;
        term /= k;
    }
    Decimal::new(sum, work as i64).truncate(digits)
}
