//! # Simulator bridge client
//!
//! Implements the racer's interfaces by exchanging `comms_if::eqpt` requests with the simulator
//! bridge. Flight, session and telemetry requests share the control link, which belongs to the
//! control loop. The gate detector is served on a separate endpoint so the perception loop owns
//! its own link.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, warn};

use comms_if::{
    eqpt::{
        flight::{FlightRequest, FlightResponse, SplineCmd, VelocityCmd},
        perception::{DetectionFrame, PerceptionRequest, PerceptionResponse},
        race::{sort_gate_names, RaceRequest, RaceResponse, SegmentScore},
    },
    net::{zmq, NetParams, SimLink, SimLinkError},
};

use crate::{
    course::Gate,
    drone::DroneState,
    interface::{BackendResult, FlightCtrl, GateDetector, SimSession, Telemetry},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Client for the bridge's flight and race server.
pub struct SimClient {
    link: SimLink,

    /// Name of the vehicle in the simulator
    vehicle: String,

    /// Receive timeout for requests which block until the vehicle has finished moving
    blocking_timeout: i32,
}

/// Client for the bridge's gate detector.
pub struct SimDetector {
    link: SimLink,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimClientError {
    #[error("Link error: {0}")]
    Link(#[from] SimLinkError),

    #[error("The bridge reported an error: {0}")]
    ServerError(String),

    #[error("Unexpected response from the bridge: {0}")]
    UnexpectedResponse(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimClient {
    /// Connect to the bridge's control endpoint.
    pub fn connect(
        ctx: &zmq::Context,
        params: &NetParams,
        vehicle: &str
    ) -> Result<Self, SimClientError> {
        let link = SimLink::connect(ctx, &params.control_endpoint, &params.link)?;

        debug!("SimClient connected to {}", params.control_endpoint);

        Ok(Self {
            link,
            vehicle: vehicle.to_string(),
            blocking_timeout: params.blocking_timeout,
        })
    }

    fn flight(&self, request: &FlightRequest) -> Result<FlightResponse, SimClientError> {
        match self.link.request(request)? {
            FlightResponse::Error(e) => Err(SimClientError::ServerError(e)),
            r => Ok(r),
        }
    }

    /// Flight request whose only valid responses are `Ok` or a started task.
    fn flight_ok(&self, request: &FlightRequest) -> Result<(), SimClientError> {
        match self.flight(request)? {
            FlightResponse::Ok => Ok(()),
            FlightResponse::TaskStarted(id) => {
                debug!("Flight task {} started", id);
                Ok(())
            }
            r => Err(unexpected(r)),
        }
    }

    fn race(&self, request: &RaceRequest) -> Result<RaceResponse, SimClientError> {
        match self.link.request(request)? {
            RaceResponse::Error(e) => Err(SimClientError::ServerError(e)),
            r => Ok(r),
        }
    }

    fn race_ok(&self, request: &RaceRequest) -> Result<(), SimClientError> {
        match self.race(request)? {
            RaceResponse::Ok => Ok(()),
            r => Err(unexpected(r)),
        }
    }

    fn race_flag(&self, request: &RaceRequest) -> Result<bool, SimClientError> {
        match self.race(request)? {
            RaceResponse::Flag(f) => Ok(f),
            r => Err(unexpected(r)),
        }
    }

    fn vehicle(&self) -> String {
        self.vehicle.clone()
    }
}

impl SimSession for SimClient {
    fn load_level(&mut self, name: &str) -> BackendResult<()> {
        Ok(self.race_ok(&RaceRequest::LoadLevel { name: name.to_string() })?)
    }

    fn start_race(&mut self, tier: u8) -> BackendResult<()> {
        Ok(self.race_ok(&RaceRequest::StartRace { tier })?)
    }

    fn reset_race(&mut self) -> BackendResult<()> {
        Ok(self.race_ok(&RaceRequest::ResetRace)?)
    }

    fn pause(&mut self) -> BackendResult<()> {
        Ok(self.race_ok(&RaceRequest::Pause)?)
    }

    fn unpause(&mut self) -> BackendResult<()> {
        Ok(self.race_ok(&RaceRequest::Unpause)?)
    }

    fn reset(&mut self) -> BackendResult<()> {
        Ok(self.race_ok(&RaceRequest::Reset)?)
    }

    fn gate_poses(&mut self) -> BackendResult<Vec<Gate>> {
        let names = match self.race(&RaceRequest::ListGates)? {
            RaceResponse::GateNames(n) => n,
            r => return Err(unexpected(r).into()),
        };

        let ordered = sort_gate_names(&names);
        if ordered.len() != names.len() {
            debug!("Ignored {} non-gate objects", names.len() - ordered.len());
        }

        let mut gates = Vec::with_capacity(ordered.len());
        for (index, name) in ordered.into_iter().enumerate() {
            match self.race(&RaceRequest::GetGatePose { name })? {
                RaceResponse::GatePose(pose) => gates.push(Gate::from_pose(index, &pose)),
                r => return Err(unexpected(r).into()),
            }
        }

        Ok(gates)
    }
}

impl FlightCtrl for SimClient {
    fn enable_control(&mut self) -> BackendResult<()> {
        Ok(self.flight_ok(&FlightRequest::EnableApiControl { vehicle: self.vehicle() })?)
    }

    fn arm(&mut self) -> BackendResult<()> {
        Ok(self.flight_ok(&FlightRequest::Arm { vehicle: self.vehicle() })?)
    }

    fn disarm(&mut self) -> BackendResult<()> {
        Ok(self.flight_ok(&FlightRequest::Disarm { vehicle: self.vehicle() })?)
    }

    fn takeoff(&mut self, height_m: f64) -> BackendResult<()> {
        let request = FlightRequest::Takeoff { vehicle: self.vehicle(), height_m };

        let response = self.link
            .request_with_timeout(&request, self.blocking_timeout)
            .map_err(SimClientError::from)?;

        match response {
            FlightResponse::Ok => Ok(()),
            FlightResponse::Error(e) => Err(SimClientError::ServerError(e).into()),
            r => Err(unexpected(r).into()),
        }
    }

    fn move_on_spline(&mut self, cmd: &SplineCmd) -> BackendResult<()> {
        Ok(self.flight_ok(&FlightRequest::MoveOnSpline {
            vehicle: self.vehicle(),
            cmd: cmd.clone(),
        })?)
    }

    fn move_by_velocity(&mut self, cmd: &VelocityCmd) -> BackendResult<()> {
        Ok(self.flight_ok(&FlightRequest::MoveByVelocity {
            vehicle: self.vehicle(),
            cmd: *cmd,
        })?)
    }

    fn kinematics(&mut self) -> BackendResult<DroneState> {
        match self.flight(&FlightRequest::GetKinematics { vehicle: self.vehicle() })? {
            FlightResponse::Kinematics(k) => Ok(DroneState::from(&k)),
            r => Err(unexpected(r).into()),
        }
    }
}

impl Telemetry for SimClient {
    fn segment_score(&mut self, gate_number: usize) -> BackendResult<Option<SegmentScore>> {
        match self.race(&RaceRequest::GetSegmentScore { gate: gate_number })? {
            RaceResponse::SegmentScore(s) => Ok(s),
            r => Err(unexpected(r).into()),
        }
    }

    fn gate_passed(&mut self, gate_number: usize) -> BackendResult<bool> {
        Ok(self.race_flag(&RaceRequest::GetGatePassed { gate: gate_number })?)
    }

    fn gate_missed(&mut self) -> BackendResult<bool> {
        Ok(self.race_flag(&RaceRequest::GetGateMissed)?)
    }

    fn collision(&mut self) -> BackendResult<bool> {
        Ok(self.race_flag(&RaceRequest::GetCollision)?)
    }

    fn race_time_s(&mut self) -> BackendResult<f64> {
        match self.race(&RaceRequest::GetRaceTime)? {
            RaceResponse::RaceTime(t) => Ok(t),
            r => Err(unexpected(r).into()),
        }
    }
}

impl SimDetector {
    /// Connect to the bridge's perception endpoint.
    pub fn connect(ctx: &zmq::Context, params: &NetParams) -> Result<Self, SimClientError> {
        Ok(Self {
            link: SimLink::connect(ctx, &params.perception_endpoint, &params.link)?,
        })
    }
}

impl GateDetector for SimDetector {
    fn detect(&mut self) -> BackendResult<DetectionFrame> {
        let response = self.link
            .request(&PerceptionRequest::Detect)
            .map_err(SimClientError::from)?;

        match response {
            PerceptionResponse::Frame(f) => Ok(f),
            PerceptionResponse::Error(e) => {
                warn!("Gate detector error: {}", e);
                Err(SimClientError::ServerError(e).into())
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn unexpected<R: std::fmt::Debug>(response: R) -> SimClientError {
    SimClientError::UnexpectedResponse(format!("{:?}", response))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;
    use comms_if::{
        eqpt::{flight::Kinematics, race::GatePose},
        net::LinkOptions,
    };
    use serde::Deserialize;

    /// Any request the control endpoint can receive
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ControlRequest {
        Flight(FlightRequest),
        Race(RaceRequest),
    }

    fn params(name: &str) -> NetParams {
        NetParams {
            control_endpoint: format!("inproc://{}_control", name),
            perception_endpoint: format!("inproc://{}_perception", name),
            link: LinkOptions::default(),
            blocking_timeout: 2000,
        }
    }

    /// Serve a fixed number of control requests with a fake bridge.
    fn serve(ctx: &zmq::Context, endpoint: &str, num_requests: usize) -> thread::JoinHandle<()> {
        let server = ctx.socket(zmq::REP).unwrap();
        server.bind(endpoint).unwrap();

        thread::spawn(move || {
            for _ in 0..num_requests {
                let msg = server.recv_string(0).unwrap().unwrap();

                let rep = match serde_json::from_str(&msg).unwrap() {
                    ControlRequest::Flight(FlightRequest::GetKinematics { .. }) => {
                        serde_json::to_string(&FlightResponse::Kinematics(Kinematics {
                            position_m: [1.0, 2.0, -3.0],
                            linear_velocity_ms: [0.5, 0.0, 0.0],
                            orientation_q: [1.0, 0.0, 0.0, 0.0],
                        }))
                    }
                    ControlRequest::Flight(FlightRequest::MoveOnSpline { .. }) => {
                        serde_json::to_string(&FlightResponse::TaskStarted(7))
                    }
                    ControlRequest::Flight(FlightRequest::Arm { vehicle }) => {
                        serde_json::to_string(&FlightResponse::Error(
                            format!("{} not found", vehicle)
                        ))
                    }
                    ControlRequest::Flight(_) => serde_json::to_string(&FlightResponse::Ok),
                    ControlRequest::Race(RaceRequest::ListGates) => {
                        serde_json::to_string(&RaceResponse::GateNames(vec![
                            "Gate02_1".into(),
                            "StartBlock".into(),
                            "Gate01_5".into(),
                        ]))
                    }
                    ControlRequest::Race(RaceRequest::GetGatePose { name }) => {
                        let x = if name == "Gate01_5" { 10.0 } else { 20.0 };
                        serde_json::to_string(&RaceResponse::GatePose(GatePose {
                            name,
                            position_m: [x, 0.0, -2.0],
                            orientation_q: [1.0, 0.0, 0.0, 0.0],
                        }))
                    }
                    ControlRequest::Race(RaceRequest::GetSegmentScore { gate }) => {
                        let score = match gate {
                            1 => Some(SegmentScore { time_s: 3.2, penalty_s: 0.5 }),
                            _ => None,
                        };
                        serde_json::to_string(&RaceResponse::SegmentScore(score))
                    }
                    ControlRequest::Race(RaceRequest::GetRaceTime) => {
                        serde_json::to_string(&RaceResponse::RaceTime(12.5))
                    }
                    ControlRequest::Race(_) => serde_json::to_string(&RaceResponse::Ok),
                };

                server.send(&rep.unwrap(), 0).unwrap();
            }
        })
    }

    #[test]
    fn test_session_and_telemetry() {
        let ctx = zmq::Context::new();
        let p = params("sim_client_session");
        let jh = serve(&ctx, &p.control_endpoint, 7);

        let mut client = SimClient::connect(&ctx, &p, "drone_1").unwrap();

        client.load_level("Soccer_Field_Easy").unwrap();

        // ListGates and one pose per gate, in course order
        let gates = client.gate_poses().unwrap();
        assert_eq!(gates.len(), 2);
        assert_eq!(gates[0].index, 0);
        assert_eq!(gates[0].position_m.x, 10.0);
        assert_eq!(gates[1].position_m.x, 20.0);

        assert_eq!(
            client.segment_score(1).unwrap(),
            Some(SegmentScore { time_s: 3.2, penalty_s: 0.5 })
        );
        assert_eq!(client.segment_score(2).unwrap(), None);
        assert_eq!(client.race_time_s().unwrap(), 12.5);

        jh.join().unwrap();
    }

    #[test]
    fn test_flight() {
        let ctx = zmq::Context::new();
        let p = params("sim_client_flight");
        let jh = serve(&ctx, &p.control_endpoint, 5);

        let mut client = SimClient::connect(&ctx, &p, "drone_1").unwrap();

        client.enable_control().unwrap();

        match client.arm() {
            Err(crate::interface::BackendError::SimClient(SimClientError::ServerError(e))) => {
                assert_eq!(e, "drone_1 not found")
            }
            r => panic!("Expected a server error, got {:?}", r),
        }

        client.takeoff(2.0).unwrap();

        client.move_on_spline(&SplineCmd {
            waypoints_m: vec![[1.0, 0.0, -2.0]],
            vel_max_ms: 5.0,
            acc_max_mss: 3.0,
            add_position_constraint: true,
            add_velocity_constraint: false,
            add_acceleration_constraint: false,
            replan_from_lookahead: false,
        }).unwrap();

        let s = client.kinematics().unwrap();
        assert_eq!(s.position_m.z, -3.0);
        assert_eq!(s.speed_ms(), 0.5);

        jh.join().unwrap();
    }

    #[test]
    fn test_detector() {
        let ctx = zmq::Context::new();
        let p = params("sim_client_detector");

        let server = ctx.socket(zmq::REP).unwrap();
        server.bind(&p.perception_endpoint).unwrap();

        let jh = thread::spawn(move || {
            for i in 0..2 {
                let msg = server.recv_string(0).unwrap().unwrap();
                let _: PerceptionRequest = serde_json::from_str(&msg).unwrap();

                let rep = match i {
                    0 => PerceptionResponse::Frame(DetectionFrame {
                        timestamp: chrono::Utc::now(),
                        boxes: vec![],
                    }),
                    _ => PerceptionResponse::Error("camera not ready".into()),
                };
                server.send(&serde_json::to_string(&rep).unwrap(), 0).unwrap();
            }
        });

        let mut det = SimDetector::connect(&ctx, &p).unwrap();
        assert!(det.detect().unwrap().boxes.is_empty());
        assert!(det.detect().is_err());

        jh.join().unwrap();
    }
}
