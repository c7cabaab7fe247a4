extern crate cbrl;
extern crate serde;
extern crate serde_json;
use serde::{Deserialize, Deserializer};
#[macro_use]
extern crate serde_derive;

use cbrl::{Action, Case, CaseId, ExitKind, Model, ModelConfig};

fn deserialize_optional_field<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CartCommand {
    pub a: Option<Action>,
    pub exit_cart: Option<bool>,
}
impl CartCommand {
    pub fn new(a: Action) -> Self {
        CartCommand {
            a: Some(a),
            exit_cart: None,
        }
    }
    pub fn exit() -> Self {
        CartCommand {
            a: None,
            exit_cart: Some(true),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Goal,
    OutOfBounds,
}

/// Position, velocity and step count of the simulated cart.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum CartState {
    Running(f64, f64, u64),
    Finished(Outcome, u64),
}

/// Frame sent from the controller to the cart engine.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ServerReceivedMsg {
    #[serde(
        default,
        deserialize_with = "deserialize_optional_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub cartcommand: Option<Option<CartCommand>>,
}
impl ServerReceivedMsg {
    pub fn set_cartcommand(&mut self, cartcommand: CartCommand) { self.cartcommand = Some(Some(cartcommand)); }
    pub fn serialize_send(msg: ServerReceivedMsg) -> Result<String, serde_json::Error> {
        serde_json::to_string(&msg)
    }
    pub fn deserialize_receive(msg: &str) -> Result<ServerReceivedMsg, serde_json::Error> {
        serde_json::from_str(msg)
    }
}

/// `type` tag of frames carrying a cart state.
pub const CARTSTATE_FRAME: &str = "cartstate";

/// Frame sent from the cart engine to the controller.
///
/// Absent fields are `None`; fields present as JSON `null` are `Some(None)`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ClientReceivedMsg {
    #[serde(
        default,
        deserialize_with = "deserialize_optional_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub cartstate: Option<Option<CartState>>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "deserialize_optional_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub type_name: Option<Option<String>>,
}
impl ClientReceivedMsg {
    pub fn set_cartstate(&mut self, cartstate: CartState) { self.cartstate = Some(Some(cartstate)); }
    pub fn set_type_name(&mut self, type_name: String) { self.type_name = Some(Some(type_name)); }
    pub fn serialize_send(msg: ClientReceivedMsg) -> Result<String, serde_json::Error> {
        serde_json::to_string(&msg)
    }
    pub fn deserialize_receive(msg: &str) -> Result<ClientReceivedMsg, serde_json::Error> {
        serde_json::from_str(msg)
    }
}

/// Flat record of one populated case.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CaseRecord {
    pub id: CaseId,
    pub state: Vec<f64>,
    pub action: Option<Action>,
    pub next_state: Vec<f64>,
    pub reward: f64,
    pub exit: ExitKind,
    pub delta: Vec<f64>,
    pub q: f64,
}
impl<'a> From<&'a Case> for CaseRecord {
    fn from(case: &'a Case) -> CaseRecord {
        CaseRecord {
            id: case.id(),
            state: case.state().to_vec(),
            action: case.action(),
            next_state: case.next_state().to_vec(),
            reward: case.reward(),
            exit: case.exit(),
            delta: case.delta().to_vec(),
            q: case.q(),
        }
    }
}

/// Snapshot of a model's configuration and case list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelDump {
    pub config: ModelConfig,
    pub cases: Vec<CaseRecord>,
}
impl ModelDump {
    pub fn from_model(model: &Model) -> ModelDump {
        ModelDump {
            config: model.config().clone(),
            cases: model.cases().iter().map(CaseRecord::from).collect(),
        }
    }
    pub fn to_json(&self) -> Result<String, serde_json::Error> { serde_json::to_string_pretty(self) }
}
