pub mod mock_completion_server;
pub mod stub_gateway;
