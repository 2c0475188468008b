// Bibliothèque de simulation de flotte de robots
// Expose tous les modules pour utilisation externe (par les binaires)

pub mod types;          // Types de base (Coordinate, RobotState, constantes)
pub mod error;          // Erreurs de configuration et de diffusion
pub mod config;         // Configuration de la simulation
pub mod logging;        // Initialisation de tracing
pub mod map;            // Grille et obstacles
pub mod pathfinding;    // Recherche de chemin A*
pub mod robot;          // État et déplacement des robots
pub mod dispatch;       // Attribution des tâches à chaque tick
pub mod simulation;     // Boucle de simulation
pub mod display;        // Affichage terminal pour mode local
pub mod network;        // Snapshots et diffusion réseau

// Ré-exportation des types principaux pour faciliter l'importation
pub use types::*;
pub use error::{FleetError, FleetResult};
pub use config::SimConfig;
pub use map::Grid;
pub use robot::Robot;
pub use dispatch::{FleetEvent, TaskKind, TaskPools};
pub use simulation::{FleetStats, SimulationState};
pub use network::{FleetSnapshot, RobotData};
