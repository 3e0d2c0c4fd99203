//! Replay: record scenarios and serialize/deserialize detection logs.

use crate::{
    detector::{DetectionFrame, DetectorSimulator},
    scenarios::Scenario,
};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A full recorded detection log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayLog {
    pub scenario_name: String,
    pub seed: u64,
    /// Detector output, one entry per frame in order
    pub frames: Vec<DetectionFrame>,
    /// Ground-truth boxes, one entry per frame in order
    pub ground_truth: Vec<GroundTruthFrame>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroundTruthFrame {
    pub frame: u64,
    pub targets: Vec<TargetBox>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TargetBox {
    pub id: u64,
    /// [x, y, a, h]
    pub xyah: [f64; 4],
}

impl ReplayLog {
    /// Ground truth for `frame`, if recorded.
    pub fn truth_at(&self, frame: u64) -> Option<&GroundTruthFrame> {
        self.ground_truth.iter().find(|g| g.frame == frame)
    }
}

/// Run a scenario to completion, recording detections and ground truth.
pub fn record(scenario: &Scenario) -> ReplayLog {
    let mut targets = scenario.targets.clone();
    let mut detector = DetectorSimulator::new(scenario.detector.clone(), scenario.seed);
    let mut frames = Vec::with_capacity(scenario.frames as usize);
    let mut ground_truth = Vec::with_capacity(scenario.frames as usize);

    for frame in 0..scenario.frames {
        ground_truth.push(GroundTruthFrame {
            frame,
            targets: targets
                .iter()
                .filter(|t| t.is_active(frame))
                .map(|t| TargetBox {
                    id: t.id,
                    xyah: [t.state[0], t.state[1], t.state[2], t.state[3]],
                })
                .collect(),
        });
        frames.push(detector.detect(frame, &targets));

        for target in &mut targets {
            target.step();
        }
    }

    ReplayLog {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        frames,
        ground_truth,
    }
}

/// Save a replay log to a JSON file.
pub fn save_replay(log: &ReplayLog, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, log)?;
    Ok(())
}

/// Load a replay log from a JSON file.
pub fn load_replay(path: &Path) -> anyhow::Result<ReplayLog> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let log: ReplayLog = serde_json::from_reader(reader)?;
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::ScenarioKind;

    #[test]
    fn record_covers_every_frame() {
        let scenario = Scenario::build(ScenarioKind::Crossing, 42);
        let log = record(&scenario);
        assert_eq!(log.frames.len() as u64, scenario.frames);
        assert_eq!(log.ground_truth.len() as u64, scenario.frames);
        // target 5 enters at frame 60
        assert_eq!(log.truth_at(0).unwrap().targets.len(), 5);
        assert_eq!(log.truth_at(60).unwrap().targets.len(), 6);
        assert!(log.frames.iter().all(|f| f.detections.len() <= 6));
    }

    #[test]
    fn json_round_trip() {
        let log = record(&Scenario::build(ScenarioKind::Single, 1));
        let path = std::env::temp_dir().join(format!("replay-{}.json", std::process::id()));

        save_replay(&log, &path).unwrap();
        let loaded = load_replay(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.scenario_name, "single");
        assert_eq!(loaded.frames.len(), log.frames.len());
        assert_eq!(loaded.frames[10].detections.len(), log.frames[10].detections.len());
    }
}
