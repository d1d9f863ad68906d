mod stats_config_tests;
