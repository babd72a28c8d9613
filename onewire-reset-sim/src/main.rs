use clap::{Parser, ValueEnum};
use onewire_reset::{
    BusReset, DelayEngine, Level, ResetMachine, ResetSequencer, ResetTiming, TickFlag,
    TransitionCell,
};
use onewire_reset_sim::{EventKind, Responder, SimBus, SimConfig};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    /// Straight-line sequencer on the timer-backed delay engine
    Blocking,
    /// Interrupt-driven reset machine
    Irq,
}

/// Run 1-Wire reset/presence-detect cycles against a simulated bus
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Which reset implementation to drive
    #[arg(short, long, value_enum, default_value_t = Mode::Blocking)]
    mode: Mode,
    /// Number of back-to-back resets
    #[arg(short = 'n', long, default_value_t = 1)]
    resets: u32,
    /// Leave the bus without a device
    #[arg(long)]
    no_device: bool,
    /// Delay from line release to the presence pulse, in µs
    #[arg(long, default_value_t = 30)]
    response_delay_us: u32,
    /// Presence pulse width, in µs
    #[arg(long, default_value_t = 120)]
    pulse_us: u32,
    /// Time taken by one read of the line, in µs
    #[arg(long, default_value_t = 1)]
    sample_cost_us: u32,
    /// Timer input clock, in Hz
    #[arg(long, default_value_t = 16_000_000)]
    clock_hz: u32,
    /// Make every Nth wakeup spurious (0 disables)
    #[arg(long, default_value_t = 0)]
    spurious_every: u32,
}

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = SimConfig {
        clock_hz: args.clock_hz,
        sample_cost_us: args.sample_cost_us,
        responder: (!args.no_device).then_some(Responder {
            response_delay_us: args.response_delay_us,
            pulse_us: args.pulse_us,
        }),
    };
    let bus = SimBus::new(config).expect("Invalid simulator configuration");
    log::info!(
        "{} Hz timer clock, prescaler {}",
        args.clock_hz,
        bus.prescaler()
    );

    match args.mode {
        Mode::Blocking => {
            let flag = TickFlag::new();
            let mut isr_timer = bus.timer();
            let idle = bus
                .idle(|| flag.on_timer_interrupt(&mut isr_timer))
                .with_spurious_wakes(args.spurious_every);
            let delay = DelayEngine::new(bus.timer(), idle, &flag);
            let timing = ResetTiming::STANDARD.with_sample_cost_us(args.sample_cost_us);
            let mut sequencer = ResetSequencer::new(bus.pin(), delay)
                .expect("Failed to take the bus pin")
                .with_timing(timing);
            run(&bus, args.resets, || {
                sequencer.reset().expect("Reset failed")
            });
        }
        Mode::Irq => {
            let cell = TransitionCell::new();
            let mut isr_timer = bus.timer();
            let mut isr_pin = bus.pin();
            let idle = bus
                .idle(|| {
                    let Ok(()) = cell.on_timer_interrupt(&mut isr_timer, &mut isr_pin);
                })
                .with_spurious_wakes(args.spurious_every);
            let timing = ResetTiming::MID_WINDOW.with_sample_cost_us(args.sample_cost_us);
            let mut machine = ResetMachine::new(bus.pin(), bus.timer(), &cell)
                .expect("Failed to take the bus pin")
                .with_idle(idle)
                .with_timing(timing);
            run(&bus, args.resets, || {
                BusReset::reset(&mut machine).expect("Reset failed")
            });
        }
    }

    for event in bus.events() {
        log::info!("{:>8} us  {:?}", event.at_us, event.kind);
    }
}

fn run(bus: &SimBus, resets: u32, mut reset: impl FnMut() -> bool) {
    for i in 0..resets {
        let start = bus.now_us();
        let presence = reset();
        let release = bus
            .events()
            .iter()
            .find(|e| e.kind == EventKind::Drive(Level::High) && e.at_us > start)
            .map(|e| e.at_us);
        log::info!(
            "Reset {}: presence = {}, {} us (released at {:?})",
            i,
            presence,
            bus.now_us() - start,
            release
        );
    }
}
