use crate::cart_logic;
use cbrl_codec::*;
use std::sync::mpsc;
use websocket::message::OwnedMessage;

pub trait CartCon {
    /// Delivers `msg` to the controller; false once nobody is listening.
    fn tx_send(&self, msg: ClientReceivedMsg, log: &mut Vec<ClientReceivedMsg>) -> bool;
}

/// Simulated cart advanced one step per received action.
pub struct CartEngine<T: CartCon> {
    connection: T,
    cartstate: CartState,
    goal: [f64; 2],
}
impl<T> CartEngine<T>
where T: CartCon
{
    pub fn new(connection: T, start: [f64; 2], goal: [f64; 2]) -> Self {
        CartEngine {
            connection,
            cartstate: CartState::Running(start[0], start[1], 0),
            goal,
        }
    }
    pub fn cartstate(&self) -> &CartState { &self.cartstate }
    /// Serves controller frames until told to exit or the command channel closes.
    ///
    /// Text frames carry a JSON `ServerReceivedMsg`; frames without a command
    /// or that fail to parse are skipped.
    pub fn run(&mut self, rx: mpsc::Receiver<OwnedMessage>, log: &mut Vec<ClientReceivedMsg>) {
        'cart: for frame in rx.iter() {
            let cart_command = match frame {
                OwnedMessage::Text(z) => match ServerReceivedMsg::deserialize_receive(&z) {
                    Ok(ServerReceivedMsg {
                        cartcommand: Some(Some(cart_command)),
                        ..
                    }) => cart_command,
                    _ => continue,
                },
                OwnedMessage::Close(_) => break 'cart,
                _ => continue,
            };
            match (&cart_command, &self.connection, &mut self.cartstate) {
                (
                    &CartCommand {
                        exit_cart: Some(true),
                        ..
                    },
                    _,
                    _,
                ) => {
                    break 'cart;
                },
                (&CartCommand { a: Some(a), .. }, con, cartstate) => {
                    if !cart_logic::update_cartstate::<T>(a, cartstate, self.goal, con, log) {
                        break 'cart;
                    }
                },
                _ => {},
            }
        }
    }
}
