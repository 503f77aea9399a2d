//! Background stepping of a propagator on a dedicated worker thread.
//!
//! A [`Session`] owns one worker that owns the propagator. Control happens
//! through commands sent over a channel, which the worker polls once per step
//! while running and blocks on while idle. Consumers never touch the
//! wavefunction: at every output step the worker publishes an immutable
//! [`Snapshot`] behind an [`Arc`] and pings every subscriber with a
//! [`Visualization`].
//!
//! A reset requested mid-run ends the run before rebuilding the wavefunction.
//! A numerical failure also ends the run; the error is logged and kept for
//! [`Session::last_error`] as a [`SessionError::Propagation`].

use std::{
    sync::{
        atomic::{ AtomicBool, Ordering },
        mpsc::{ self, TryRecvError },
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
    },
    thread,
};
use log::{ debug, error, trace, warn };
use ndarray as nd;
use crate::{
    error::{ SessionError, TError },
    timedep::{ Propagator, Snapshot },
};

pub type SResult<T> = Result<T, SessionError>;

/// Notification that a new snapshot has been published.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Visualization;

type Configure<P> = Box<dyn FnOnce(&mut P) + Send>;

enum Command<P> {
    Run,
    Steps(usize),
    Stop,
    Reset,
    Configure(Configure<P>),
    Subscribe(mpsc::Sender<Visualization>),
    WaitIdle(mpsc::Sender<()>),
    Destroy,
}

struct Shared<D: nd::Dimension> {
    latest: Mutex<Option<Arc<Snapshot<D>>>>,
    running: AtomicBool,
    last_error: Mutex<Option<SessionError>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Mode {
    Idle,
    Free,
    Bounded(usize),
}

struct Worker<P: Propagator> {
    prop: P,
    rx: mpsc::Receiver<Command<P>>,
    shared: Arc<Shared<P::Dim>>,
    subscribers: Vec<mpsc::Sender<Visualization>>,
    waiters: Vec<mpsc::Sender<()>>,
    mode: Mode,
}

impl<P: Propagator> Worker<P> {
    fn run(mut self) {
        debug!("session: worker started");
        loop {
            let cmd
                = if self.mode == Mode::Idle {
                    match self.rx.recv() {
                        Ok(cmd) => Some(cmd),
                        Err(_) => break,
                    }
                } else {
                    match self.rx.try_recv() {
                        Ok(cmd) => Some(cmd),
                        Err(TryRecvError::Empty) => None,
                        Err(TryRecvError::Disconnected) => break,
                    }
                };
            if let Some(cmd) = cmd {
                if !self.handle(cmd) { break; }
            }
            if self.mode != Mode::Idle { self.advance(); }
        }
        self.shutdown();
    }

    // returns false when the worker should exit
    fn handle(&mut self, cmd: Command<P>) -> bool {
        match cmd {
            Command::Run => { self.start(Mode::Free); },
            Command::Steps(0) => { },
            Command::Steps(n) => { self.start(Mode::Bounded(n)); },
            Command::Stop => { self.set_idle(); },
            Command::Reset => {
                self.set_idle();
                debug!("session: reset");
                match self.prop.reset() {
                    Ok(()) => { self.publish(); },
                    Err(err) => { self.fail(err); },
                }
            },
            Command::Configure(f) => { f(&mut self.prop); },
            Command::Subscribe(tx) => { self.subscribers.push(tx); },
            Command::WaitIdle(tx) => {
                if self.mode == Mode::Idle {
                    tx.send(()).ok();
                } else {
                    self.waiters.push(tx);
                }
            },
            Command::Destroy => { return false; },
        }
        true
    }

    fn start(&mut self, mode: Mode) {
        trace!("session: running ({:?})", mode);
        self.mode = mode;
        self.shared.running.store(true, Ordering::Release);
    }

    fn set_idle(&mut self) {
        if self.mode == Mode::Idle { return; }
        self.mode = Mode::Idle;
        self.shared.running.store(false, Ordering::Release);
        self.publish();
        self.waiters.drain(..).for_each(|tx| { tx.send(()).ok(); });
    }

    fn advance(&mut self) {
        match self.prop.step() {
            Ok(due) => {
                if due { self.publish(); }
                if let Mode::Bounded(k) = &mut self.mode {
                    *k -= 1;
                    if *k == 0 { self.set_idle(); }
                }
            },
            Err(err) => {
                error!("session: step {} failed: {}", self.prop.steps(), err);
                self.fail(err);
                self.set_idle();
            },
        }
    }

    fn fail(&mut self, err: TError) {
        *lock(&self.shared.last_error) = Some(SessionError::Propagation(err));
    }

    fn publish(&mut self) {
        match self.prop.snapshot() {
            Ok(snap) => {
                *lock(&self.shared.latest) = Some(Arc::new(snap));
                self.subscribers.retain(|tx| tx.send(Visualization).is_ok());
            },
            Err(err) => { warn!("session: no snapshot available: {}", err); },
        }
    }

    fn shutdown(&mut self) {
        debug!("session: worker shutting down");
        self.prop.destroy();
        self.subscribers.clear();
        self.waiters.clear();
        self.shared.running.store(false, Ordering::Release);
        *lock(&self.shared.latest) = None;
    }
}

/// Handle to a propagator running on its own worker thread.
///
/// Dropping the handle destroys the session.
pub struct Session<P: Propagator> {
    tx: Option<mpsc::Sender<Command<P>>>,
    worker: Option<thread::JoinHandle<()>>,
    shared: Arc<Shared<P::Dim>>,
}

impl<P> Session<P>
where P: Propagator + 'static
{
    /// Move `propagator` onto a new worker thread. The worker starts idle,
    /// with a snapshot of the initial state already published.
    pub fn new(propagator: P) -> SResult<Self> {
        let shared
            = Arc::new(Shared {
                latest: Mutex::new(propagator.snapshot().ok().map(Arc::new)),
                running: AtomicBool::new(false),
                last_error: Mutex::new(None),
            });
        let (tx, rx) = mpsc::channel();
        let worker
            = Worker {
                prop: propagator,
                rx,
                shared: Arc::clone(&shared),
                subscribers: Vec::new(),
                waiters: Vec::new(),
                mode: Mode::Idle,
            };
        let handle
            = thread::Builder::new()
            .name("qbox-session".into())
            .spawn(move || worker.run())
            .map_err(|err| SessionError::Spawn(err.to_string()))?;
        Ok(Self { tx: Some(tx), worker: Some(handle), shared })
    }
}

impl<P: Propagator> Session<P> {
    fn send(&self, cmd: Command<P>) -> SResult<()> {
        self.tx.as_ref()
            .ok_or(SessionError::Disconnected)?
            .send(cmd)
            .map_err(|_| SessionError::Disconnected)
    }

    /// Step until [`stop`][Self::stop] is called or a step fails.
    pub fn run(&self) -> SResult<()> { self.send(Command::Run) }

    /// Take `n` steps, then go idle.
    pub fn run_steps(&self, n: usize) -> SResult<()> { self.send(Command::Steps(n)) }

    /// End the current run after the step in progress.
    pub fn stop(&self) -> SResult<()> { self.send(Command::Stop) }

    /// Rebuild the wavefunction from the propagator's packets, ending any run
    /// first.
    pub fn reset(&self) -> SResult<()> { self.send(Command::Reset) }

    /// Apply `f` to the propagator between two steps.
    pub fn configure<F>(&self, f: F) -> SResult<()>
    where F: FnOnce(&mut P) + Send + 'static
    {
        self.send(Command::Configure(Box::new(f)))
    }

    /// Receive a [`Visualization`] every time a snapshot is published.
    pub fn subscribe(&self) -> SResult<mpsc::Receiver<Visualization>> {
        let (tx, rx) = mpsc::channel();
        self.send(Command::Subscribe(tx))?;
        Ok(rx)
    }

    /// Block until the worker has processed every command sent so far and is
    /// idle.
    pub fn wait_idle(&self) -> SResult<()> {
        let (tx, rx) = mpsc::channel();
        self.send(Command::WaitIdle(tx))?;
        rx.recv().map_err(|_| SessionError::Disconnected)
    }

    pub fn is_running(&self) -> bool { self.shared.running.load(Ordering::Acquire) }

    /// Most recently published snapshot.
    pub fn latest(&self) -> Option<Arc<Snapshot<P::Dim>>> {
        lock(&self.shared.latest).clone()
    }

    /// Error that ended the most recent failed run or reset, if any.
    pub fn last_error(&self) -> Option<SessionError> {
        lock(&self.shared.last_error).clone()
    }

    /// Stop the worker, release the propagator's arrays, and drop all
    /// subscribers. Safe to call more than once.
    pub fn destroy(&mut self) {
        if let Some(tx) = self.tx.take() {
            tx.send(Command::Destroy).ok();
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("session: worker panicked");
            }
            debug!("session: destroyed");
        }
    }
}

impl<P: Propagator> Drop for Session<P> {
    fn drop(&mut self) { self.destroy(); }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use super::*;
    use crate::{
        grid::Grid1,
        packet::Packet1D,
        particle::Particle,
        timedep::{ Cayley1D, Model1D },
    };

    fn session() -> Session<Cayley1D> {
        let grid = Grid1::new(128, -10.0, 10.0).unwrap();
        let model = Model1D::new(grid, Particle::default(), 0.05).unwrap()
            .with_packet(Packet1D::Gaussian {
                magnitude: 1.0, sigma: 1.0, center: 0.0, momentum: 1.0 })
            .unwrap();
        Session::new(Cayley1D::new(model).unwrap()).unwrap()
    }

    #[test]
    fn bounded_run_goes_idle() {
        let s = session();
        assert_eq!(s.latest().unwrap().step, 0);
        s.run_steps(120).unwrap();
        s.wait_idle().unwrap();
        assert!(!s.is_running());
        assert_eq!(s.latest().unwrap().step, 120);
        assert!(s.last_error().is_none());
    }

    #[test]
    fn subscribers_notified_at_outputs() {
        let s = session();
        let rx = s.subscribe().unwrap();
        s.run_steps(100).unwrap();
        s.wait_idle().unwrap();
        // steps 50 and 100, then the end of the run
        assert_eq!(rx.try_iter().count(), 3);
        s.configure(|p| { p.set_output_interval(10).ok(); }).unwrap();
        s.run_steps(30).unwrap();
        s.wait_idle().unwrap();
        assert_eq!(rx.try_iter().count(), 4);
    }

    #[test]
    fn dropped_subscribers_pruned() {
        let s = session();
        drop(s.subscribe().unwrap());
        let rx = s.subscribe().unwrap();
        s.run_steps(50).unwrap();
        s.wait_idle().unwrap();
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn stop_ends_free_run() {
        let s = session();
        s.run().unwrap();
        thread::sleep(Duration::from_millis(50));
        s.stop().unwrap();
        s.wait_idle().unwrap();
        assert!(!s.is_running());
        let step = s.latest().unwrap().step;
        assert!(step > 0);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(s.latest().unwrap().step, step);
    }

    #[test]
    fn reset_during_run_rebuilds() {
        let s = session();
        s.run().unwrap();
        thread::sleep(Duration::from_millis(20));
        s.reset().unwrap();
        s.wait_idle().unwrap();
        assert!(!s.is_running());
        assert_eq!(s.latest().unwrap().step, 0);
    }

    #[test]
    fn failure_is_recorded() {
        let s = session();
        s.configure(|p| p.destroy()).unwrap();
        s.run_steps(5).unwrap();
        s.wait_idle().unwrap();
        assert_eq!(
            s.last_error(),
            Some(SessionError::Propagation(TError::Destroyed)),
        );
        assert!(!s.is_running());
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut s = session();
        s.destroy();
        s.destroy();
        assert_eq!(s.run(), Err(SessionError::Disconnected));
        assert!(s.latest().is_none());
        assert!(!s.is_running());
    }
}
