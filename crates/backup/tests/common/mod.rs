pub mod fake_channel;
