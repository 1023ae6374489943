//! Arcade Drive headless driver
//!
//! Runs a scripted or seeded-random drive at a fixed step and logs telemetry.
//!
//! ```text
//! arcade-drive [--tuning FILE] [--save-tuning FILE] [--seed N] [--ticks N]
//! ```

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::PathBuf;

    use arcade_drive::consts::SIM_DT;
    use arcade_drive::sim::{
        ControlState, DriveSession, PoseChannel, SteeringMount, TickInput, WheelRig, tick,
    };
    use arcade_drive::{Tuning, TuningError};
    use clap::Parser;
    use glam::DVec3;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    /// Node names of the bundled kart model
    const MODEL_NODES: [&str; 5] = ["Chassis", "RoueAG", "RoueAD", "RoueDG", "RoueDD"];

    const DEFAULT_TICKS: u64 = 600;
    const LOG_EVERY: u64 = 30;

    /// Headless arcade drive: scripted or seeded-random laps with telemetry logging
    #[derive(Parser, Debug)]
    #[command(author, version, about, long_about = None)]
    struct Args {
        /// Tuning JSON to load (missing fields keep their defaults)
        #[arg(long)]
        tuning: Option<PathBuf>,

        /// Write the tuning in use to this file before driving
        #[arg(long)]
        save_tuning: Option<PathBuf>,

        /// Drive random inputs from this seed instead of the scripted lap
        #[arg(long)]
        seed: Option<u64>,

        /// Number of fixed steps to run
        #[arg(long, default_value_t = DEFAULT_TICKS)]
        ticks: u64,
    }

    /// Fixed demo lap: launch, sweep left, brake, back up, coast, respawn
    fn scripted_input(t: u64) -> TickInput {
        let control = match t % 600 {
            0..120 => ControlState {
                accelerate: true,
                ..Default::default()
            },
            120..240 => ControlState {
                accelerate: true,
                steer_left: true,
                ..Default::default()
            },
            240..300 => ControlState {
                brake: true,
                ..Default::default()
            },
            300..390 => ControlState {
                reverse: true,
                steer_right: true,
                ..Default::default()
            },
            _ => ControlState::default(),
        };
        TickInput {
            control,
            reset: t > 0 && t % 600 == 0,
        }
    }

    /// Random key presses held for short random stretches
    struct RandomDriver {
        rng: Pcg32,
        current: ControlState,
        hold: u32,
    }

    impl RandomDriver {
        fn new(seed: u64) -> Self {
            Self {
                rng: Pcg32::seed_from_u64(seed),
                current: ControlState::default(),
                hold: 0,
            }
        }

        fn next_input(&mut self) -> TickInput {
            if self.hold == 0 {
                self.current = ControlState {
                    accelerate: self.rng.random_bool(0.6),
                    brake: self.rng.random_bool(0.1),
                    reverse: self.rng.random_bool(0.2),
                    steer_left: self.rng.random_bool(0.3),
                    steer_right: self.rng.random_bool(0.3),
                };
                self.hold = self.rng.random_range(10..90);
            }
            self.hold -= 1;
            TickInput {
                control: self.current,
                reset: self.rng.random_bool(0.001),
            }
        }
    }

    fn build_session(tuning: Tuning) -> DriveSession<&'static str> {
        let mut session = DriveSession::spawned(tuning, DVec3::ZERO);

        let mut rig = WheelRig::new();
        for node in MODEL_NODES {
            if let Some(slot) = rig.offer_node(node, node) {
                log::debug!("Node {} -> {:?}", node, slot);
            }
        }
        rig.set_mount(SteeringMount::FrontLeft, "PivotAG")
            .set_mount(SteeringMount::FrontRight, "PivotAD");
        match rig.resolve() {
            Ok(resolved) => session.wheels.attach(resolved),
            Err(rig) => {
                let missing: Vec<_> = rig.missing_wheels().collect();
                log::warn!("Wheel rig incomplete, missing {:?}", missing);
            }
        }
        session
    }

    fn log_frame(session: &DriveSession<&'static str>) {
        let Some(t) = session.telemetry() else {
            return;
        };
        log::info!(
            "t={:>5} speed={:.3} ({:>3} km/h) dir={:+.2} heading={:.3} pos=({:.2}, {:.2}, {:.2})",
            session.time_ticks,
            t.speed,
            t.kph,
            t.travel_direction,
            t.heading,
            t.position.x,
            t.position.y,
            t.position.z
        );
        for (node, channel, angle) in session.wheels.poses() {
            if channel == PoseChannel::Steer {
                log::debug!("  {} steer={:.3}", node, angle);
            } else {
                log::trace!("  {} spin={:.2}", node, angle);
            }
        }
    }

    pub fn run() -> Result<(), TuningError> {
        let args = Args::parse();
        let tuning = match &args.tuning {
            Some(path) => Tuning::load_or_default(path),
            None => Tuning::default(),
        };
        if let Some(path) = &args.save_tuning {
            tuning.save(path)?;
        }

        let mut session = build_session(tuning);
        let ticks = args.ticks;
        let mut random = args.seed.map(|seed| {
            log::info!("Random drive with seed: {}", seed);
            RandomDriver::new(seed)
        });

        for t in 0..ticks {
            let input = match random.as_mut() {
                Some(driver) => driver.next_input(),
                None => scripted_input(t),
            };
            if input.reset {
                log::info!("Respawn at t={}", t);
            }
            tick(&mut session, &input, SIM_DT);
            if t % LOG_EVERY == 0 {
                log_frame(&session);
            }
        }

        if let Some(state) = session.vehicle_state() {
            log::info!(
                "Finished {} ticks at ({:.2}, {:.2}, {:.2}), speed {:.3}",
                session.time_ticks,
                state.position.x,
                state.position.y,
                state.position.z,
                state.speed()
            );
        }
        Ok(())
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Arcade Drive (headless) starting...");
    if let Err(e) = native::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Embedded builds drive `sim::tick` from the host frame loop
}
