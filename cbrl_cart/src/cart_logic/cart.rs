use crate::cart_logic::cart_engine::CartCon;
use cbrl_codec::*;
use futures::channel::mpsc;
use std::fmt;
use websocket::message::OwnedMessage;

/// Engine side of the engine-to-controller channel.
///
/// Frames are JSON text messages; every frame that carries a cart state is
/// also kept in the engine's trajectory log.
#[derive(Clone)]
pub struct Connection {
    pub sender: mpsc::UnboundedSender<OwnedMessage>,
}
impl CartCon for Connection {
    fn tx_send(&self, msg: ClientReceivedMsg, log: &mut Vec<ClientReceivedMsg>) -> bool {
        if let Some(Some(_)) = msg.cartstate {
            log.push(msg.clone());
        }
        match ClientReceivedMsg::serialize_send(msg) {
            Ok(text) => self.sender.unbounded_send(OwnedMessage::Text(text)).is_ok(),
            Err(_) => false,
        }
    }
}
impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "Connection") }
}
impl Connection {
    pub fn new(sender: mpsc::UnboundedSender<OwnedMessage>) -> Connection { Connection { sender } }
}

/// Wraps `command` in the text frame the engine expects.
pub fn command_frame(command: CartCommand) -> Result<OwnedMessage, serde_json::Error> {
    let mut msg = ServerReceivedMsg::default();
    msg.set_cartcommand(command);
    Ok(OwnedMessage::Text(ServerReceivedMsg::serialize_send(msg)?))
}

/// Cart state carried by an engine frame.
///
/// Only text frames tagged `cartstate` count; anything else yields `None`.
pub fn read_cartstate(frame: &OwnedMessage) -> Result<Option<CartState>, serde_json::Error> {
    let z = match *frame {
        OwnedMessage::Text(ref z) => z,
        _ => return Ok(None),
    };
    match ClientReceivedMsg::deserialize_receive(z)? {
        ClientReceivedMsg {
            cartstate: Some(Some(cartstate)),
            type_name: Some(Some(ref t)),
            ..
        } if t == CARTSTATE_FRAME => Ok(Some(cartstate)),
        _ => Ok(None),
    }
}
