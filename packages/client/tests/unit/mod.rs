//! Unit tests module
//!
//! Contains tests for the quota tracker and submission controller in
//! isolation, with in-memory storage and scripted endpoints.

mod submission_test;
