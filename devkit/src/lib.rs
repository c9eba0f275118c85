/*!
Charger DevKit - Outils de test pour le pont chargeurs/MQTT

Permet de tester le bridge sans broker ni matériel:
- Mock de contrôleur chargeur (lectures scriptées, commandes enregistrées)
- Enregistreur du bus sortant avec assertions par topic
- Harness complet qui câble un bridge sur les deux mocks
*/

pub mod bus;
pub mod charger_stub;
pub mod test_utils;

pub use bus::BusRecorder;
pub use charger_stub::{reading, CommandAction, MockCharger, RecordedCommand};
pub use test_utils::BridgeHarness;
