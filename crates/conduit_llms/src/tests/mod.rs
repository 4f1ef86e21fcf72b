mod http_provider;
