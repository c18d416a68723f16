//! # ragline
//!
//! Line-grained retrieval-augmented question answering over hosted services.
//!
//! ragline uploads a text file line by line into a hosted vector index
//! (Pinecone) using hosted embeddings (OpenAI), then answers natural-language
//! questions by retrieving the nearest stored lines and forwarding them as
//! context to a hosted chat completion.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌─────────────┐
//! │  upload   │──▶│   Ingestion   │──▶│  Pinecone   │
//! │  (file)   │   │ chunk+embed  │   │   index     │
//! └──────────┘   └───────────────┘   └──────┬──────┘
//!                                           │ query
//! ┌──────────┐   ┌───────────────┐          ▼
//! │ question  │──▶│    Answer     │◀── nearest lines
//! │  (chat)   │   │ embed+query  │
//! └──────────┘   │ +complete    │──▶ answer text
//!                └───────────────┘
//! ```
//!
//! All heavy computation (embedding, nearest-neighbor search, generation)
//! is delegated to the hosted services; this crate sequences the calls,
//! owns the chunking/metadata/context-reconstruction logic, and keeps
//! per-session state (chat history, uploaded-text cache).
//!
//! ## Quick Start
//!
//! ```bash
//! export OPENAI_API_KEY=...
//! export PINECONE_API_KEY=...
//! ragline upload notes.txt --index my-chatbot-data
//! ragline ask "what do the notes say about apples?"
//! ragline chat --file notes.txt      # interactive session
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Line-granular chunking |
//! | [`embedding`] | Embedding gateway (OpenAI) |
//! | [`index`] | Vector index gateway (Pinecone) |
//! | [`completion`] | Completion gateway (OpenAI chat) |
//! | [`ingest`] | Ingestion pipeline |
//! | [`answer`] | Answer pipeline |
//! | [`session`] | Session-scoped chat history + text cache |
//! | [`repl`] | Interactive chat loop |

pub mod answer;
pub mod chunk;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod http;
pub mod index;
pub mod ingest;
pub mod models;
pub mod repl;
pub mod session;
