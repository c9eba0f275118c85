/*!
Mock de contrôleur chargeur pour développement sans matériel

Simule un ChargerController: lectures scriptées par canal, pannes
injectables, et enregistrement de chaque commande start/stop pour les
assertions de tests.
*/

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use charger_bridge::controller::{
    ChannelReading, ChargeMode, ChargerController, ControllerError, CELLS_PER_CHANNEL,
    CHANNELS_PER_CHARGER,
};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAction {
    Start {
        cell_count: u8,
        current_ma: u32,
        mode: ChargeMode,
    },
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub channel: usize,
    pub action: CommandAction,
}

#[derive(Default)]
struct ChannelScript {
    steps: VecDeque<Result<ChannelReading, ControllerError>>,
    /// Rejoué quand le script est épuisé (lectures stables).
    last_ok: Option<ChannelReading>,
}

#[derive(Default)]
struct Inner {
    scripts: [ChannelScript; CHANNELS_PER_CHARGER],
    commands: Vec<RecordedCommand>,
}

/// Mock clonable: toutes les copies partagent le même état, le test garde
/// un clone pour ses assertions pendant que le bridge possède l'autre.
#[derive(Clone, Default)]
pub struct MockCharger {
    inner: Arc<Mutex<Inner>>,
}

impl MockCharger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Programme la prochaine lecture du canal.
    pub fn push_reading(&self, channel: usize, reading: ChannelReading) {
        self.inner.lock().unwrap().scripts[channel]
            .steps
            .push_back(Ok(reading));
    }

    /// Programme une panne pour la prochaine lecture du canal.
    pub fn push_failure(&self, channel: usize, err: ControllerError) {
        self.inner.lock().unwrap().scripts[channel]
            .steps
            .push_back(Err(err));
    }

    /// Toutes les commandes start/stop reçues, dans l'ordre.
    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.inner.lock().unwrap().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.inner.lock().unwrap().commands.clear();
    }
}

impl ChargerController for MockCharger {
    fn get_channel_info(&mut self, channel: usize) -> Result<ChannelReading, ControllerError> {
        let mut inner = self.inner.lock().unwrap();
        let script = &mut inner.scripts[channel];
        match script.steps.pop_front() {
            Some(Ok(reading)) => {
                script.last_ok = Some(reading.clone());
                Ok(reading)
            }
            Some(Err(e)) => Err(e),
            // script épuisé: on rejoue la dernière lecture connue
            None => Ok(script.last_ok.clone().unwrap_or_default()),
        }
    }

    fn start_charge(
        &mut self,
        channel: usize,
        cell_count: u8,
        current_ma: u32,
        mode: ChargeMode,
    ) -> Result<(), ControllerError> {
        self.inner.lock().unwrap().commands.push(RecordedCommand {
            channel,
            action: CommandAction::Start {
                cell_count,
                current_ma,
                mode,
            },
        });
        Ok(())
    }

    fn stop_charge(&mut self, channel: usize) -> Result<(), ControllerError> {
        self.inner.lock().unwrap().commands.push(RecordedCommand {
            channel,
            action: CommandAction::Stop,
        });
        Ok(())
    }
}

/// Construit une lecture de canal: champs scalaires nommés + cellules.
pub fn reading(fields: &[(&str, i64)], cells: [i64; CELLS_PER_CHANNEL]) -> ChannelReading {
    let mut r = ChannelReading::default();
    for (name, value) in fields {
        r.fields.insert((*name).to_string(), json!(value));
    }
    r.cells = cells;
    r
}
