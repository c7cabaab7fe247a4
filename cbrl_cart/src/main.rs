extern crate cbrl;
extern crate cbrl_codec;
extern crate futures;
extern crate serde_json;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate slog;

use cbrl::{logging, Action, Model, ModelError};
pub mod cart_logic;

use crate::cart_logic::{
    cart::{command_frame, read_cartstate, Connection},
    CartConfig,
};
use cbrl_codec::*;
use futures::{channel::mpsc as fmpsc, executor::block_on, StreamExt};
use slog::Logger;
use std::{error::Error, fs, sync::mpsc, thread};
use websocket::message::OwnedMessage;

/// How a controlled run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Episode {
    Finished(Outcome, u64),
    /// The cart reached a state no case covers.
    Unknown(u64),
    StepLimit(u64),
}

pub struct Cart {
    x: f64,
    v: f64,
    steps: u64,
    tx: mpsc::Sender<OwnedMessage>,
    con_rx: fmpsc::UnboundedReceiver<OwnedMessage>,
    engine: Option<thread::JoinHandle<Vec<ClientReceivedMsg>>>,
}

impl Cart {
    /// Spawns a cart engine starting at `start`.
    pub fn new(start: [f64; 2], goal: [f64; 2]) -> Cart {
        let (tx, rx) = mpsc::channel();
        let (con_tx, con_rx) = fmpsc::unbounded();
        let cart_con = Connection::new(con_tx);
        let engine = thread::spawn(move || {
            let mut log: Vec<ClientReceivedMsg> = vec![];
            cart_logic::CartEngine::new(cart_con, start, goal).run(rx, &mut log);
            log
        });

        Cart {
            x: start[0],
            v: start[1],
            steps: 0,
            tx,
            con_rx,
            engine: Some(engine),
        }
    }

    pub fn state(&self) -> [f64; 2] { [self.x, self.v] }

    /// Sends `a` to the engine and waits for the resulting cart state.
    pub fn step(&mut self, a: Action) -> Result<CartState, Box<dyn Error>> {
        self.tx.send(command_frame(CartCommand::new(a))?)?;

        while let Some(msg) = block_on(self.con_rx.next()) {
            if let Some(cartstate) = read_cartstate(&msg)? {
                match cartstate {
                    CartState::Running(x, v, steps) => {
                        self.x = x;
                        self.v = v;
                        self.steps = steps;
                    },
                    CartState::Finished(_, steps) => self.steps = steps,
                }
                return Ok(cartstate);
            }
        }

        Err("cart engine hung up".into())
    }

    /// Stops the engine and returns the states it reported.
    pub fn finish(mut self) -> Vec<ClientReceivedMsg> {
        if let Ok(frame) = command_frame(CartCommand::exit()) {
            let _ = self.tx.send(frame);
        }
        self.engine
            .take()
            .and_then(|engine| engine.join().ok())
            .unwrap_or_default()
    }
}

/// Drives a cart from `start` with the model's greedy action.
pub fn run_episode(
    model: &Model,
    config: &CartConfig,
    start: [f64; 2],
    logger: &Logger,
) -> Result<Episode, Box<dyn Error>>
{
    let mut cart = Cart::new(start, config.goal);
    let episode = loop {
        if cart.steps >= config.max_steps {
            break Episode::StepLimit(cart.steps);
        }
        let action = match cart_logic::choose_action(model, config, cart.state()) {
            Ok(Some(action)) => action,
            Ok(None) => break Episode::Finished(cart_logic::terminal_outcome(config, cart.state()), cart.steps),
            Err(ModelError::NoNeighboursFound) => break Episode::Unknown(cart.steps),
            Err(e) => return Err(e.into()),
        };
        debug!(logger, "step"; "x" => cart.x, "v" => cart.v, "action" => action);
        if let CartState::Finished(outcome, steps) = cart.step(action)? {
            break Episode::Finished(outcome, steps);
        }
    };

    let trajectory = cart.finish();
    info!(logger, "episode finished";
        "start" => ?start, "result" => ?episode, "frames" => trajectory.len());
    Ok(episode)
}

struct Args {
    config: Option<String>,
    dump: Option<String>,
}

fn parse_args() -> Result<Args, Box<dyn Error>> {
    let mut args = Args {
        config: None,
        dump: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--dump" => args.dump = Some(it.next().ok_or("--dump needs a path")?),
            _ if args.config.is_none() => args.config = Some(arg),
            _ => return Err(format!("unexpected argument {}", arg).into()),
        }
    }
    Ok(args)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args()?;
    let config: CartConfig = match args.config {
        Some(ref path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => CartConfig::default(),
    };

    config.validate()?;

    let logger = logging::root(logging::stdout());
    let mut model = Model::new(config.model.clone())?.with_logger(logger.new(o!("component" => "model")));

    // Training phase:
    let build = cart_logic::build_model(&mut model, &config, &logger)?;
    let solve = model.solve_q();
    info!(logger, "model ready";
        "cases" => model.len(), "truncated" => build.truncated,
        "sweeps" => solve.sweeps, "converged" => solve.converged);

    // Testing phase:
    for start in &config.starts {
        run_episode(&model, &config, *start, &logger)?;
    }

    if let Some(path) = args.dump {
        fs::write(&path, ModelDump::from_model(&model).to_json()?)?;
        info!(logger, "wrote case dump"; "path" => path, "cases" => model.len());
    }

    Ok(())
}
