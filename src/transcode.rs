//! Serializes a transcode job into the argument list for the external
//! transcoding process: input sources first, then the filter graph, then the
//! output stream mappings, then the output path. Pure string assembly; no
//! state machine and no process handling.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One input fed to the transcoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceInput {
    /// A media file, optionally decoded from a start offset in seconds.
    File {
        path: PathBuf,
        start_offset: Option<f64>,
    },
    /// A still image looped into a video stream of fixed length.
    StillImage {
        path: PathBuf,
        duration: f64,
        frame_rate: u32,
    },
    /// Generated silence.
    SilentAudio {
        channel_layout: String,
        sample_rate: u32,
        duration: f64,
    },
}

impl SourceInput {
    fn push_args(&self, args: &mut Vec<String>) {
        match self {
            SourceInput::File { path, start_offset } => {
                if let Some(offset) = start_offset {
                    args.push("-ss".to_string());
                    args.push(offset.to_string());
                }
                args.push("-i".to_string());
                args.push(path.to_string_lossy().into_owned());
            }
            SourceInput::StillImage {
                path,
                duration,
                frame_rate,
            } => {
                args.push("-loop".to_string());
                args.push("1".to_string());
                args.push("-framerate".to_string());
                args.push(frame_rate.to_string());
                args.push("-t".to_string());
                args.push(duration.to_string());
                args.push("-i".to_string());
                args.push(path.to_string_lossy().into_owned());
            }
            SourceInput::SilentAudio {
                channel_layout,
                sample_rate,
                duration,
            } => {
                args.push("-f".to_string());
                args.push("lavfi".to_string());
                args.push("-t".to_string());
                args.push(duration.to_string());
                args.push("-i".to_string());
                args.push(format!(
                    "anullsrc=channel_layout={channel_layout}:sample_rate={sample_rate}"
                ));
            }
        }
    }
}

/// Media lane of a stream selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    Video,
    Audio,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Video => write!(f, "v"),
            StreamKind::Audio => write!(f, "a"),
        }
    }
}

/// Addresses one stream: a lane of a numbered input, or a pad label produced
/// by an earlier filter chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamSelector {
    Stream { input: usize, kind: StreamKind },
    Pad(String),
}

impl StreamSelector {
    /// Bracketed form used inside the filter graph.
    fn graph_label(&self) -> String {
        match self {
            StreamSelector::Stream { input, kind } => format!("[{input}:{kind}]"),
            StreamSelector::Pad(label) => format!("[{label}]"),
        }
    }

    /// Form accepted by an output mapping.
    fn map_target(&self) -> String {
        match self {
            StreamSelector::Stream { input, kind } => format!("{input}:{kind}"),
            StreamSelector::Pad(label) => format!("[{label}]"),
        }
    }
}

/// One filter with its key=value arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub args: Vec<(String, String)>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Filter {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push((key.into(), value.into()));
        self
    }

    fn render(&self) -> String {
        if self.args.is_empty() {
            return self.name.clone();
        }
        let args: Vec<String> = self
            .args
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        format!("{}={}", self.name, args.join(":"))
    }
}

/// A chain of filters routed from input selectors to labelled output pads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterChain {
    pub inputs: Vec<StreamSelector>,
    pub filters: Vec<Filter>,
    pub outputs: Vec<String>,
}

impl FilterChain {
    fn render(&self) -> String {
        let inputs: String = self.inputs.iter().map(|s| s.graph_label()).collect();
        let filters: Vec<String> = self.filters.iter().map(Filter::render).collect();
        let outputs: String = self
            .outputs
            .iter()
            .map(|label| format!("[{label}]"))
            .collect();
        format!("{inputs}{}{outputs}", filters.join(","))
    }
}

/// Everything needed for one transcoder invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeJob {
    pub inputs: Vec<SourceInput>,
    pub filter_graph: Vec<FilterChain>,
    pub mappings: Vec<StreamSelector>,
    pub output_path: PathBuf,
}

impl TranscodeJob {
    /// Flatten the job into the ordered argument list.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for input in &self.inputs {
            input.push_args(&mut args);
        }
        if !self.filter_graph.is_empty() {
            args.push("-filter_complex".to_string());
            let chains: Vec<String> = self.filter_graph.iter().map(FilterChain::render).collect();
            args.push(chains.join(";"));
        }
        for mapping in &self.mappings {
            args.push("-map".to_string());
            args.push(mapping.map_target());
        }
        args.push(self.output_path.to_string_lossy().into_owned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_source_emits_offset_before_input() {
        let source = SourceInput::File {
            path: PathBuf::from("/media/clip.mp4"),
            start_offset: Some(1.5),
        };
        let mut args = Vec::new();
        source.push_args(&mut args);
        assert_eq!(args, vec!["-ss", "1.5", "-i", "/media/clip.mp4"]);
    }

    #[test]
    fn still_image_loops_for_its_duration() {
        let source = SourceInput::StillImage {
            path: PathBuf::from("/media/title.png"),
            duration: 4.0,
            frame_rate: 25,
        };
        let mut args = Vec::new();
        source.push_args(&mut args);
        assert_eq!(
            args,
            vec![
                "-loop",
                "1",
                "-framerate",
                "25",
                "-t",
                "4",
                "-i",
                "/media/title.png"
            ]
        );
    }

    #[test]
    fn silent_audio_is_a_lavfi_source() {
        let source = SourceInput::SilentAudio {
            channel_layout: "stereo".to_string(),
            sample_rate: 48_000,
            duration: 2.0,
        };
        let mut args = Vec::new();
        source.push_args(&mut args);
        assert_eq!(
            args,
            vec![
                "-f",
                "lavfi",
                "-t",
                "2",
                "-i",
                "anullsrc=channel_layout=stereo:sample_rate=48000"
            ]
        );
    }

    #[test]
    fn filter_chain_routes_selectors_through_named_pads() {
        let chain = FilterChain {
            inputs: vec![StreamSelector::Stream {
                input: 0,
                kind: StreamKind::Video,
            }],
            filters: vec![
                Filter::new("scale").arg("w", "1280").arg("h", "720"),
                Filter::new("hflip"),
            ],
            outputs: vec!["v0".to_string()],
        };
        assert_eq!(chain.render(), "[0:v]scale=w=1280:h=720,hflip[v0]");
    }

    #[test]
    fn job_orders_inputs_graph_mappings_and_output() {
        let job = TranscodeJob {
            inputs: vec![
                SourceInput::File {
                    path: PathBuf::from("a.mp4"),
                    start_offset: None,
                },
                SourceInput::File {
                    path: PathBuf::from("b.mp4"),
                    start_offset: None,
                },
            ],
            filter_graph: vec![
                FilterChain {
                    inputs: vec![
                        StreamSelector::Stream {
                            input: 0,
                            kind: StreamKind::Video,
                        },
                        StreamSelector::Stream {
                            input: 1,
                            kind: StreamKind::Video,
                        },
                    ],
                    filters: vec![Filter::new("concat").arg("n", "2").arg("v", "1").arg("a", "0")],
                    outputs: vec!["outv".to_string()],
                },
            ],
            mappings: vec![
                StreamSelector::Pad("outv".to_string()),
                StreamSelector::Stream {
                    input: 0,
                    kind: StreamKind::Audio,
                },
            ],
            output_path: PathBuf::from("out.mp4"),
        };
        assert_eq!(
            job.to_args(),
            vec![
                "-i",
                "a.mp4",
                "-i",
                "b.mp4",
                "-filter_complex",
                "[0:v][1:v]concat=n=2:v=1:a=0[outv]",
                "-map",
                "[outv]",
                "-map",
                "0:a",
                "out.mp4"
            ]
        );
    }

    #[test]
    fn job_without_filters_omits_the_graph_argument() {
        let job = TranscodeJob {
            inputs: vec![SourceInput::File {
                path: PathBuf::from("a.mp4"),
                start_offset: None,
            }],
            filter_graph: Vec::new(),
            mappings: vec![StreamSelector::Stream {
                input: 0,
                kind: StreamKind::Video,
            }],
            output_path: PathBuf::from("out.mkv"),
        };
        assert_eq!(
            job.to_args(),
            vec!["-i", "a.mp4", "-map", "0:v", "out.mkv"]
        );
    }
}
